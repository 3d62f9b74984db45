//! Block storage for one 16×16×16 section layer.
//!
//! Two encodings are provided: [`LegacyStorage`], which stores legacy ids and meta directly, and
//! [`FlattenedStorage`], which stores indices into a palette of states and grows the palette as
//! new states are written. Every storage is scoped to one registry, its local registry, and
//! [`ToGlobalView`] lets any storage be accessed in the numbering of the global registry.

mod bits;
mod flattened;
mod legacy;
mod palette;
mod pool;
mod section;
mod upgrade;
mod view;

pub use flattened::{FlattenedStorage, PaletteEntry};
pub use legacy::LegacyStorage;
pub use pool::{
    set_shared_pool_capacity,
    shared_pool_capacity,
    ArrayPool,
    PoolStats,
    PooledArray,
    DEFAULT_POOL_CAPACITY,
};
pub use section::Section;
pub use upgrade::upgrade_legacy;
pub use view::{to_global, ToGlobalView};

use crate::{block::BlockState, registry::BlockRegistry, BlockError, StateId};
use std::sync::Arc;

/// The number of cells in a section layer.
pub const SECTION_VOLUME: usize = 16 * 16 * 16;

/// Computes the index of a cell within a section layer. Coordinates are ordered `y`, `z`, `x`
/// from most to least significant.
///
/// # Panics
///
/// Panics if any coordinate is not in `[0, 16)`.
#[inline]
pub fn cell_index(x: usize, y: usize, z: usize) -> usize {
    assert!(
        x < 16 && y < 16 && z < 16,
        "Cell coordinates ({}, {}, {}) are outside of the section",
        x,
        y,
        z
    );

    (y << 8) | (z << 4) | x
}

/// Per-cell access to the states of a section layer.
///
/// Runtime ids and states are those of the storage's local registry. Coordinates outside of
/// `[0, 16)` panic.
pub trait BlockStorage: Send + Sync {
    /// The registry whose runtime ids this storage holds.
    fn registry(&self) -> &Arc<dyn BlockRegistry>;

    /// Returns the runtime id of the state at the given position.
    fn block_runtime_id(&self, x: usize, y: usize, z: usize) -> Result<StateId, BlockError>;

    /// Writes the state with the given runtime id at the given position.
    fn set_block_runtime_id(&mut self, x: usize, y: usize, z: usize, runtime_id: StateId) -> Result<(), BlockError>;

    /// Returns the state at the given position.
    fn block_state(&self, x: usize, y: usize, z: usize) -> Result<BlockState, BlockError> {
        self.registry().state(self.block_runtime_id(x, y, z)?)
    }

    /// Writes the given state at the given position. The state must belong to this storage's
    /// registry.
    fn set_block_state(&mut self, x: usize, y: usize, z: usize, state: &BlockState) -> Result<(), BlockError> {
        if state.registry_id() != self.registry().id() {
            return Err(BlockError::invalid(format!(
                "{} belongs to {}, not to {}",
                state,
                state.registry_id(),
                self.registry().id()
            )));
        }

        self.set_block_runtime_id(x, y, z, state.runtime_id())
    }

    /// Deep-copies this storage.
    fn clone_storage(&self) -> Box<dyn BlockStorage>;
}

impl BlockStorage for Box<dyn BlockStorage> {
    fn registry(&self) -> &Arc<dyn BlockRegistry> {
        (**self).registry()
    }

    fn block_runtime_id(&self, x: usize, y: usize, z: usize) -> Result<StateId, BlockError> {
        (**self).block_runtime_id(x, y, z)
    }

    fn set_block_runtime_id(&mut self, x: usize, y: usize, z: usize, runtime_id: StateId) -> Result<(), BlockError> {
        (**self).set_block_runtime_id(x, y, z, runtime_id)
    }

    fn block_state(&self, x: usize, y: usize, z: usize) -> Result<BlockState, BlockError> {
        (**self).block_state(x, y, z)
    }

    fn set_block_state(&mut self, x: usize, y: usize, z: usize, state: &BlockState) -> Result<(), BlockError> {
        (**self).set_block_state(x, y, z, state)
    }

    fn clone_storage(&self) -> Box<dyn BlockStorage> {
        (**self).clone_storage()
    }
}

/// Iterates over every cell position in index order.
pub fn cells() -> impl Iterator<Item = (usize, usize, usize)> {
    (0 .. 16).flat_map(|y| (0 .. 16).flat_map(move |z| (0 .. 16).map(move |x| (x, y, z))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_order() {
        assert_eq!(cell_index(0, 0, 0), 0);
        assert_eq!(cell_index(1, 0, 0), 1);
        assert_eq!(cell_index(0, 0, 1), 16);
        assert_eq!(cell_index(0, 1, 0), 256);
        assert_eq!(cell_index(15, 15, 15), SECTION_VOLUME - 1);

        for (i, (x, y, z)) in cells().enumerate() {
            assert_eq!(cell_index(x, y, z), i);
        }
    }

    #[test]
    #[should_panic]
    fn coordinates_bounded() {
        cell_index(0, 16, 0);
    }
}
