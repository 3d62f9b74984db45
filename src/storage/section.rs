use super::{upgrade_legacy, BlockStorage, FlattenedStorage, LegacyStorage};
use crate::{
    block::BlockState,
    fluid::merge_fluid,
    registry::BlockRegistry,
    BlockError,
    StateId,
};
use std::sync::Arc;

/// A 16×16×16 section made of a block layer and an optional fluid layer.
///
/// Layer 1 is created on the first write of something other than air. Until then it reads as
/// air everywhere.
#[derive(Clone, Debug)]
pub struct Section {
    blocks: FlattenedStorage,
    fluids: Option<FlattenedStorage>,
}

impl Section {
    /// Creates a section of air.
    pub fn new(registry: Arc<dyn BlockRegistry>) -> Self {
        Section {
            blocks: FlattenedStorage::new(registry),
            fluids: None,
        }
    }

    /// Upgrades a legacy storage, moving any fluid to layer 1.
    pub fn from_legacy(legacy: &LegacyStorage) -> Result<Self, BlockError> {
        let (blocks, fluids) = upgrade_legacy(legacy)?;
        Ok(Section { blocks, fluids })
    }

    /// The registry shared by both layers.
    pub fn registry(&self) -> &Arc<dyn BlockRegistry> {
        self.blocks.registry()
    }

    /// The given layer, or `None` if layer 1 has not been created.
    pub fn layer(&self, layer: usize) -> Result<Option<&FlattenedStorage>, BlockError> {
        match layer {
            0 => Ok(Some(&self.blocks)),
            1 => Ok(self.fluids.as_ref()),
            _ => Err(invalid_layer(layer)),
        }
    }

    /// Returns the runtime id at the given position and layer.
    pub fn block_runtime_id(&self, x: usize, y: usize, z: usize, layer: usize) -> Result<StateId, BlockError> {
        match self.layer(layer)? {
            Some(storage) => storage.block_runtime_id(x, y, z),
            None => Ok(self.registry().air().runtime_id()),
        }
    }

    /// Returns the state at the given position and layer.
    pub fn block_state(&self, x: usize, y: usize, z: usize, layer: usize) -> Result<BlockState, BlockError> {
        match self.layer(layer)? {
            Some(storage) => storage.block_state(x, y, z),
            None => Ok(self.registry().air()),
        }
    }

    /// Writes the state with the given runtime id at the given position and layer.
    pub fn set_block_runtime_id(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        layer: usize,
        runtime_id: StateId,
    ) -> Result<(), BlockError>
    {
        self.storage_for_write(layer, runtime_id)?
            .map_or(Ok(()), |storage| storage.set_block_runtime_id(x, y, z, runtime_id))
    }

    /// Writes a state at the given position and layer.
    pub fn set_block_state(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        layer: usize,
        state: &BlockState,
    ) -> Result<(), BlockError>
    {
        if state.registry_id() != self.registry().id() {
            return Err(BlockError::invalid(format!(
                "{} does not belong to this section's registry",
                state
            )));
        }

        self.storage_for_write(layer, state.runtime_id())?
            .map_or(Ok(()), |storage| storage.set_block_state(x, y, z, state))
    }

    // Writing air to a missing layer leaves it missing
    fn storage_for_write(
        &mut self,
        layer: usize,
        runtime_id: StateId,
    ) -> Result<Option<&mut FlattenedStorage>, BlockError>
    {
        match layer {
            0 => Ok(Some(&mut self.blocks)),
            1 if self.fluids.is_none() && runtime_id == self.registry().air().runtime_id() => Ok(None),
            1 => {
                let registry = self.blocks.registry().clone();
                Ok(Some(
                    self.fluids
                        .get_or_insert_with(|| FlattenedStorage::new(registry)),
                ))
            }
            _ => Err(invalid_layer(layer)),
        }
    }

    /// Recombines both layers at the given position into a single runtime id, undoing the split
    /// performed by [`from_legacy`](Section::from_legacy).
    pub fn merged_runtime_id(&self, x: usize, y: usize, z: usize) -> Result<StateId, BlockError> {
        let block = self.block_runtime_id(x, y, z, 0)?;
        let fluid = self.block_runtime_id(x, y, z, 1)?;

        let fluid = if fluid == self.registry().air().runtime_id() {
            0
        } else {
            fluid
        };

        merge_fluid(self.registry().fluids(), block, fluid)
    }
}

fn invalid_layer(layer: usize) -> BlockError {
    BlockError::invalid(format!("Sections have layers 0 and 1, got {}", layer))
}
