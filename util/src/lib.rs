#![warn(missing_docs)]

//! Provides generic utilities for qblocks, the block state and section storage library.

mod identifier;
/// Configures log4rs to copy minecraft's logging style.
pub mod logging;
/// Bit twiddling helpers used by packed storages.
pub mod math;

pub use identifier::{Identifier, IdentifierParseError};
