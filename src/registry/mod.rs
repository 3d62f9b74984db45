mod cache;
mod converter;
/// The per-version description format.
pub mod description;
mod global;
mod tables;
/// The vanilla block set registered by [`init`](crate::init).
pub mod vanilla;
mod version;

pub use cache::VersionRegistries;
pub use converter::RegistryConverter;
pub use global::GlobalBlockRegistry;
pub use version::VersionBlockRegistry;

use crate::{
    block::{BlockState, BlockType},
    fluid::FluidRegistry,
    BlockError,
    StateId,
};
use qblocks_util::Identifier;
use std::{
    fmt::{self, Display, Formatter},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

/// A process-unique handle identifying one registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryId(u32);

impl RegistryId {
    pub(crate) fn new() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        RegistryId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for RegistryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "registry#{}", self.0)
    }
}

/// Lookups across the four coordinate systems of a block registry: identifiers, legacy ids with
/// meta, runtime ids, and block states themselves.
///
/// Lookup misses return one of the `Unknown*` variants of [`BlockError`]. Callers are expected to
/// validate their input first; these are not recoverable conditions.
pub trait BlockRegistry: Send + Sync {
    /// The handle of this registry.
    fn id(&self) -> RegistryId;

    /// Returns whether this is the global registry.
    fn is_global(&self) -> bool;

    /// The default state of `minecraft:air`.
    fn air(&self) -> BlockState;

    /// The number of registered states.
    fn state_count(&self) -> usize;

    /// The highest registered runtime id.
    fn max_runtime_id(&self) -> StateId;

    /// Returns whether a block type with the given identifier is registered.
    fn contains_identifier(&self, identifier: &Identifier) -> bool;

    /// Returns whether a block type with the given legacy id is registered.
    fn contains_legacy_id(&self, legacy_id: u16) -> bool;

    /// Returns whether a state with the given legacy id and meta is registered.
    fn contains_legacy_state(&self, legacy_id: u16, meta: u8) -> bool;

    /// Returns whether a state with the given runtime id is registered.
    fn contains_runtime_id(&self, runtime_id: StateId) -> bool;

    /// Returns the block type with the given identifier.
    fn block_type(&self, identifier: &Identifier) -> Result<Arc<BlockType>, BlockError>;

    /// Returns the legacy id of the block type with the given identifier.
    fn legacy_id(&self, identifier: &Identifier) -> Result<u16, BlockError> {
        self.block_type(identifier)?
            .legacy_id()
            .ok_or_else(|| BlockError::UnknownIdentifier(identifier.clone()))
    }

    /// Returns the identifier of the block type with the given legacy id.
    fn identifier_for_legacy(&self, legacy_id: u16) -> Result<Identifier, BlockError> {
        Ok(self.legacy_block_type(legacy_id)?.identifier().clone())
    }

    /// Returns the block type with the given legacy id.
    fn legacy_block_type(&self, legacy_id: u16) -> Result<Arc<BlockType>, BlockError>;

    /// Returns the state with the given runtime id.
    fn state(&self, runtime_id: StateId) -> Result<BlockState, BlockError>;

    /// Returns the default state of the block type with the given identifier.
    fn default_state(&self, identifier: &Identifier) -> Result<BlockState, BlockError> {
        Ok(self.block_type(identifier)?.default_state())
    }

    /// Returns the default state of the block type with the given legacy id.
    fn default_state_for_legacy(&self, legacy_id: u16) -> Result<BlockState, BlockError> {
        Ok(self.legacy_block_type(legacy_id)?.default_state())
    }

    /// Returns the state with the given legacy id and meta.
    fn state_for_legacy(&self, legacy_id: u16, meta: u8) -> Result<BlockState, BlockError>;

    /// Returns the runtime id of the state with the given legacy id and meta.
    fn runtime_id_for_legacy(&self, legacy_id: u16, meta: u8) -> Result<StateId, BlockError> {
        Ok(self.state_for_legacy(legacy_id, meta)?.runtime_id())
    }

    /// Resolves a state from its identifier and textual trait values. Traits that are not named
    /// take their default value.
    fn state_from_properties(
        &self,
        identifier: &Identifier,
        properties: &[(&str, &str)],
    ) -> Result<BlockState, BlockError>
    {
        self.block_type(identifier)?
            .state_from_properties(properties.iter().copied())
    }

    /// Calls `f` with every registered identifier.
    fn for_each_identifier(&self, f: &mut dyn FnMut(&Identifier));

    /// Calls `f` with every registered legacy id and the identifier it belongs to.
    fn for_each_legacy_id(&self, f: &mut dyn FnMut(u16, &Identifier));

    /// Calls `f` with every registered state.
    fn for_each_state(&self, f: &mut dyn FnMut(&BlockState));

    /// Calls `f` with every registered runtime id.
    fn for_each_runtime_id(&self, f: &mut dyn FnMut(StateId)) {
        self.for_each_state(&mut |state| f(state.runtime_id()));
    }

    /// The converter from this registry's runtime ids to the global registry's.
    fn to_global(&self) -> &RegistryConverter;

    /// The fluid component embedded in this registry's legacy ids.
    fn fluids(&self) -> &dyn FluidRegistry;
}
