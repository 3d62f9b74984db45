use super::{
    cell_index,
    pool::{ArrayPool, PooledArray, BYTE_POOL},
    BlockStorage,
    SECTION_VOLUME,
};
use crate::{registry::BlockRegistry, BlockError, StateId};
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

const NIBBLE_VOLUME: usize = SECTION_VOLUME / 2;

/// Storage in the pre-flattening layout: one byte of block id per cell, a nibble of meta per
/// cell, and an optional extension nibble holding bits 8 to 11 of the id.
///
/// Runtime ids are resolved through the legacy ids of the storage's registry, so only states
/// with a legacy id and meta can be written.
pub struct LegacyStorage {
    registry: Arc<dyn BlockRegistry>,
    pool: ArrayPool<u8>,
    blocks: PooledArray<u8>,
    meta: PooledArray<u8>,
    add: Option<PooledArray<u8>>,
}

#[inline]
fn nibble(array: &[u8], index: usize) -> u8 {
    let byte = array[index >> 1];
    // Even cells use the low nibble
    if index & 1 == 0 {
        byte & 0xF
    } else {
        byte >> 4
    }
}

#[inline]
fn set_nibble(array: &mut [u8], index: usize, value: u8) {
    let byte = &mut array[index >> 1];
    if index & 1 == 0 {
        *byte = (*byte & 0xF0) | (value & 0xF);
    } else {
        *byte = (*byte & 0x0F) | (value << 4);
    }
}

impl LegacyStorage {
    /// Creates a storage filled with legacy id `0` and meta `0`.
    pub fn new(registry: Arc<dyn BlockRegistry>) -> Self {
        Self::with_pool(registry, BYTE_POOL.clone())
    }

    /// Creates an empty storage whose buffers come from the given pool.
    pub fn with_pool(registry: Arc<dyn BlockRegistry>, pool: ArrayPool<u8>) -> Self {
        LegacyStorage {
            registry,
            blocks: pool.acquire(SECTION_VOLUME),
            meta: pool.acquire(NIBBLE_VOLUME),
            add: None,
            pool,
        }
    }

    /// Imports the raw arrays of a pre-flattening section: 4096 block id bytes, 2048 bytes of
    /// meta nibbles and optionally 2048 bytes of extension nibbles.
    pub fn from_raw(
        registry: Arc<dyn BlockRegistry>,
        blocks: &[u8],
        meta: &[u8],
        add: Option<&[u8]>,
    ) -> Result<Self, BlockError>
    {
        let check = |name: &str, array: &[u8], expected: usize| {
            if array.len() == expected {
                Ok(())
            } else {
                Err(BlockError::invalid(format!(
                    "Expected {} bytes of {}, got {}",
                    expected,
                    name,
                    array.len()
                )))
            }
        };
        check("block ids", blocks, SECTION_VOLUME)?;
        check("meta", meta, NIBBLE_VOLUME)?;
        if let Some(add) = add {
            check("extension nibbles", add, NIBBLE_VOLUME)?;
        }

        let pool = BYTE_POOL.clone();
        Ok(LegacyStorage {
            registry,
            blocks: pool.acquire_copy(blocks),
            meta: pool.acquire_copy(meta),
            add: add.map(|add| pool.acquire_copy(add)),
            pool,
        })
    }

    /// Returns the legacy id at the given position.
    pub fn legacy_id(&self, x: usize, y: usize, z: usize) -> u16 {
        let index = cell_index(x, y, z);
        let high = self
            .add
            .as_ref()
            .map(|add| nibble(add, index) as u16)
            .unwrap_or(0);

        high << 8 | self.blocks[index] as u16
    }

    /// Returns the meta at the given position.
    pub fn meta(&self, x: usize, y: usize, z: usize) -> u8 {
        nibble(&self.meta, cell_index(x, y, z))
    }

    /// Returns the legacy id and meta at the given position as `id << 4 | meta`.
    pub fn combined_id_meta(&self, x: usize, y: usize, z: usize) -> u16 {
        self.legacy_id(x, y, z) << 4 | self.meta(x, y, z) as u16
    }

    /// Writes a legacy id and meta at the given position.
    pub fn set_legacy(&mut self, x: usize, y: usize, z: usize, legacy_id: u16, meta: u8) -> Result<(), BlockError> {
        check_meta(meta)?;
        self.set_legacy_id(x, y, z, legacy_id)?;
        set_nibble(&mut self.meta, cell_index(x, y, z), meta);
        Ok(())
    }

    /// Writes a legacy id at the given position, leaving its meta unchanged.
    pub fn set_legacy_id(&mut self, x: usize, y: usize, z: usize, legacy_id: u16) -> Result<(), BlockError> {
        if legacy_id as usize >= SECTION_VOLUME {
            return Err(BlockError::invalid(format!(
                "Legacy id {} is outside of [0, {})",
                legacy_id, SECTION_VOLUME
            )));
        }

        let index = cell_index(x, y, z);
        self.blocks[index] = legacy_id as u8;

        let high = (legacy_id >> 8) as u8;
        if let Some(add) = &mut self.add {
            set_nibble(add, index, high);
        } else if high != 0 {
            let mut add = self.pool.acquire(NIBBLE_VOLUME);
            set_nibble(&mut add, index, high);
            self.add = Some(add);
        }

        Ok(())
    }

    /// Writes a meta at the given position, leaving its legacy id unchanged.
    pub fn set_meta(&mut self, x: usize, y: usize, z: usize, meta: u8) -> Result<(), BlockError> {
        check_meta(meta)?;
        set_nibble(&mut self.meta, cell_index(x, y, z), meta);
        Ok(())
    }

    /// Returns whether legacy ids above 255 have been stored.
    pub fn has_add(&self) -> bool {
        self.add.is_some()
    }
}

fn check_meta(meta: u8) -> Result<(), BlockError> {
    if meta < 16 {
        Ok(())
    } else {
        Err(BlockError::invalid(format!("Meta {} is outside of [0, 16)", meta)))
    }
}

impl BlockStorage for LegacyStorage {
    fn registry(&self) -> &Arc<dyn BlockRegistry> {
        &self.registry
    }

    fn block_runtime_id(&self, x: usize, y: usize, z: usize) -> Result<StateId, BlockError> {
        self.registry
            .runtime_id_for_legacy(self.legacy_id(x, y, z), self.meta(x, y, z))
    }

    fn set_block_runtime_id(&mut self, x: usize, y: usize, z: usize, runtime_id: StateId) -> Result<(), BlockError> {
        let state = self.registry.state(runtime_id)?;
        let (legacy_id, meta) = state
            .legacy()
            .ok_or_else(|| BlockError::invalid(format!("{} has no legacy id and meta", state)))?;

        self.set_legacy(x, y, z, legacy_id, meta)
    }

    fn clone_storage(&self) -> Box<dyn BlockStorage> {
        Box::new(self.clone())
    }
}

impl Clone for LegacyStorage {
    fn clone(&self) -> Self {
        LegacyStorage {
            registry: self.registry.clone(),
            pool: self.pool.clone(),
            blocks: self.blocks.clone(),
            meta: self.meta.clone(),
            add: self.add.clone(),
        }
    }
}

impl Debug for LegacyStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyStorage")
            .field("registry", &self.registry.id())
            .field("has_add", &self.has_add())
            .finish()
    }
}
