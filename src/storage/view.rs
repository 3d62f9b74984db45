use super::{cells, BlockStorage, FlattenedStorage};
use crate::{registry::BlockRegistry, BlockError, StateId};
use std::sync::Arc;

/// Presents a storage of a version registry in the numbering of the global registry.
///
/// Reads convert through the registry's converter, so states without a global equivalent read
/// as global air. Writes take global runtime ids and convert them back, falling back to the
/// version's air.
pub struct ToGlobalView<S> {
    inner: S,
    global: Arc<dyn BlockRegistry>,
}

impl<S: BlockStorage> ToGlobalView<S> {
    /// Wraps a storage. Fails if the storage already uses the global registry.
    pub fn new(inner: S) -> Result<Self, BlockError> {
        let global = inner
            .registry()
            .to_global()
            .global()
            .cloned()
            .ok_or_else(|| BlockError::invalid("Storage already uses the global registry"))?;

        Ok(ToGlobalView {
            inner,
            global,
        })
    }

    /// The wrapped storage.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwraps the view.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: BlockStorage> BlockStorage for ToGlobalView<S> {
    fn registry(&self) -> &Arc<dyn BlockRegistry> {
        &self.global
    }

    fn block_runtime_id(&self, x: usize, y: usize, z: usize) -> Result<StateId, BlockError> {
        let local = self.inner.block_runtime_id(x, y, z)?;
        Ok(self.inner.registry().to_global().to_global(local))
    }

    fn set_block_runtime_id(&mut self, x: usize, y: usize, z: usize, runtime_id: StateId) -> Result<(), BlockError> {
        if !self.global.contains_runtime_id(runtime_id) {
            return Err(BlockError::UnknownRuntimeId(runtime_id));
        }

        let local = self.inner.registry().to_global().from_global(runtime_id);
        self.inner.set_block_runtime_id(x, y, z, local)
    }

    fn clone_storage(&self) -> Box<dyn BlockStorage> {
        Box::new(ToGlobalView {
            inner: self.inner.clone_storage(),
            global: self.global.clone(),
        })
    }
}

/// Returns a storage in the numbering of the global registry.
///
/// Storages that already use the global registry are returned unchanged. Otherwise the storage
/// is either wrapped in a [`ToGlobalView`] or, when `prefer_view` is false, copied eagerly into a
/// new [`FlattenedStorage`] of the global registry.
pub fn to_global(storage: Box<dyn BlockStorage>, prefer_view: bool) -> Result<Box<dyn BlockStorage>, BlockError> {
    if storage.registry().is_global() {
        return Ok(storage);
    }

    let view = ToGlobalView::new(storage)?;
    if prefer_view {
        return Ok(Box::new(view));
    }

    let mut copy = FlattenedStorage::new(view.registry().clone());
    for (x, y, z) in cells() {
        copy.set_block_runtime_id(x, y, z, view.block_runtime_id(x, y, z)?)?;
    }
    Ok(Box::new(copy))
}
