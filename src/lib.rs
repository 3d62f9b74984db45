#![deny(rust_2018_idioms)]
#![warn(missing_docs)]

//! Block states, registries and section storage for Minecraft-like voxel data.
//!
//! Block types are described by their traits, and every combination of trait values is a
//! [`BlockState`](block::BlockState) with a dense runtime id. A single
//! [`GlobalBlockRegistry`](registry::GlobalBlockRegistry) defines the canonical numbering, and
//! a [`VersionBlockRegistry`](registry::VersionBlockRegistry) per format revision maps that
//! revision's ids to it. Sections of 16×16×16 cells are stored either in the legacy id and meta
//! layout or in palette-compressed storage.

pub use qblocks_util as util;

/// Block traits, block types and block states.
pub mod block;
/// Library configuration.
pub mod config;
mod error;
pub mod fluid;
/// Global and per-version block registries.
pub mod registry;
pub mod storage;

pub use error::BlockError;
pub use qblocks_util::Identifier;

use config::Config;
use log::info;
use registry::{vanilla::Blocks, BlockRegistry, GlobalBlockRegistry, VersionRegistries};
use std::{error::Error, sync::Arc};

/// A runtime id: the dense, registry-scoped number of a block state.
pub type StateId = u32;

/// Creates the global registry with the standard block set registered.
pub fn init() -> Result<(Arc<GlobalBlockRegistry>, Blocks), BlockError> {
    let global = GlobalBlockRegistry::new();
    let blocks = Blocks::register(&global)?;

    info!(
        "Initialized global block registry with {} states",
        global.state_count()
    );
    Ok((global, blocks))
}

/// Like [`init`], also applying the configured pool capacity and creating the version registry
/// cache.
pub fn init_with_config(config: &Config) -> Result<(Arc<GlobalBlockRegistry>, Blocks, VersionRegistries), BlockError> {
    if !storage::set_shared_pool_capacity(config.pool_capacity) {
        log::warn!(
            "Storage pools already in use, keeping a capacity of {}",
            storage::shared_pool_capacity()
        );
    }

    let (global, blocks) = init()?;
    let versions = VersionRegistries::from_config(global.clone(), config);
    Ok((global, blocks, versions))
}

/// Starts logging with the configured level and log directory. Debug and trace records are only
/// kept for this crate.
pub fn init_logging(config: &Config) -> Result<(), Box<dyn Error>> {
    util::logging::init_logger(module_path!(), &config.log)
}
