use crate::{
    block::{BlockState, BlockType},
    BlockError,
    StateId,
};
use qblocks_util::Identifier;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

const NO_TYPE: u32 = u32::MAX;

#[inline]
fn combined(legacy_id: u16, meta: u8) -> u32 {
    (legacy_id as u32) << 4 | meta as u32
}

/// The lookup tables shared by every registry implementation.
#[derive(Default)]
pub(crate) struct RegistryTables {
    types: Vec<Arc<BlockType>>,
    by_identifier: HashMap<Identifier, u32>,
    by_legacy: BTreeMap<u16, u32>,
    // Runtime id to (type index, state offset)
    runtime: Vec<(u32, u32)>,
    legacy_states: HashMap<u32, StateId>,
    state_count: usize,
}

impl RegistryTables {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a block type, leaving the tables unchanged if any coordinate collides.
    pub(crate) fn insert(&mut self, ty: Arc<BlockType>) -> Result<(), BlockError> {
        if self.by_identifier.contains_key(ty.identifier()) {
            return Err(BlockError::DuplicateRegistration(ty.identifier().to_string()));
        }

        if let Some(legacy_id) = ty.legacy_id() {
            if self.by_legacy.contains_key(&legacy_id) {
                return Err(BlockError::DuplicateRegistration(format!(
                    "Legacy id {} of {}",
                    legacy_id,
                    ty.identifier()
                )));
            }
        }

        for state in ty.states() {
            let runtime_id = state.runtime_id();
            if self.contains_runtime_id(runtime_id) {
                return Err(BlockError::DuplicateRegistration(format!(
                    "Runtime id {} of {}",
                    runtime_id, state
                )));
            }

            if let Some((legacy_id, meta)) = state.legacy() {
                if self.legacy_states.contains_key(&combined(legacy_id, meta)) {
                    return Err(BlockError::DuplicateRegistration(format!(
                        "Legacy state {}:{} of {}",
                        legacy_id, meta, state
                    )));
                }
            }
        }

        // Runtime ids and legacy pairs within one type are distinct by construction, so nothing
        // below can fail
        let type_index = self.types.len() as u32;
        for state in ty.states() {
            let runtime_id = state.runtime_id() as usize;
            if runtime_id >= self.runtime.len() {
                self.runtime.resize(runtime_id + 1, (NO_TYPE, 0));
            }
            self.runtime[runtime_id] = (type_index, state.offset() as u32);

            if let Some((legacy_id, meta)) = state.legacy() {
                self.legacy_states
                    .insert(combined(legacy_id, meta), state.runtime_id());
            }
        }

        if let Some(legacy_id) = ty.legacy_id() {
            self.by_legacy.insert(legacy_id, type_index);
        }
        self.by_identifier.insert(ty.identifier().clone(), type_index);
        self.state_count += ty.state_count();
        self.types.push(ty);

        Ok(())
    }

    #[inline]
    pub(crate) fn types(&self) -> &[Arc<BlockType>] {
        &self.types
    }

    #[inline]
    pub(crate) fn state_count(&self) -> usize {
        self.state_count
    }

    /// One past the highest runtime id in use.
    #[inline]
    pub(crate) fn runtime_id_limit(&self) -> usize {
        self.runtime.len()
    }

    pub(crate) fn max_runtime_id(&self) -> StateId {
        self.runtime.len().saturating_sub(1) as StateId
    }

    pub(crate) fn contains_identifier(&self, identifier: &Identifier) -> bool {
        self.by_identifier.contains_key(identifier)
    }

    pub(crate) fn contains_legacy_id(&self, legacy_id: u16) -> bool {
        self.by_legacy.contains_key(&legacy_id)
    }

    pub(crate) fn contains_legacy_state(&self, legacy_id: u16, meta: u8) -> bool {
        meta < 16 && self.legacy_states.contains_key(&combined(legacy_id, meta))
    }

    pub(crate) fn contains_runtime_id(&self, runtime_id: StateId) -> bool {
        matches!(self.runtime.get(runtime_id as usize), Some(&(ty, _)) if ty != NO_TYPE)
    }

    pub(crate) fn block_type(&self, identifier: &Identifier) -> Result<Arc<BlockType>, BlockError> {
        self.by_identifier
            .get(identifier)
            .map(|&index| self.types[index as usize].clone())
            .ok_or_else(|| BlockError::UnknownIdentifier(identifier.clone()))
    }

    pub(crate) fn legacy_block_type(&self, legacy_id: u16) -> Result<Arc<BlockType>, BlockError> {
        self.by_legacy
            .get(&legacy_id)
            .map(|&index| self.types[index as usize].clone())
            .ok_or(BlockError::UnknownLegacyId(legacy_id))
    }

    pub(crate) fn state(&self, runtime_id: StateId) -> Result<BlockState, BlockError> {
        match self.runtime.get(runtime_id as usize) {
            Some(&(ty, offset)) if ty != NO_TYPE => self.types[ty as usize]
                .state_at(offset as usize)
                .ok_or(BlockError::UnknownRuntimeId(runtime_id)),
            _ => Err(BlockError::UnknownRuntimeId(runtime_id)),
        }
    }

    pub(crate) fn legacy_runtime_id(&self, legacy_id: u16, meta: u8) -> Result<StateId, BlockError> {
        if meta >= 16 {
            return Err(BlockError::UnknownLegacyState { legacy_id, meta });
        }

        self.legacy_states
            .get(&combined(legacy_id, meta))
            .copied()
            .ok_or(BlockError::UnknownLegacyState { legacy_id, meta })
    }

    pub(crate) fn legacy_ids(&self) -> impl Iterator<Item = (u16, &Identifier)> + '_ {
        self.by_legacy
            .iter()
            .map(move |(&legacy_id, &index)| (legacy_id, self.types[index as usize].identifier()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::{values::WOOD_TYPE, BlockTypeBuilder, Trait},
        registry::RegistryId,
    };

    fn planks(registry: RegistryId, base: StateId, legacy_id: u16) -> Arc<BlockType> {
        BlockTypeBuilder::new(Identifier::minecraft("planks"))
            .with_trait(WOOD_TYPE.erase())
            .legacy_id(legacy_id)
            .build(registry, |offset, _| Ok((base + offset as StateId, Some(offset as u8))))
            .unwrap()
    }

    #[test]
    fn lookups() {
        let registry = RegistryId::new();
        let mut tables = RegistryTables::new();
        tables.insert(planks(registry, 10, 5)).unwrap();

        assert_eq!(tables.state_count(), 8);
        assert_eq!(tables.max_runtime_id(), 17);
        assert!(!tables.contains_runtime_id(9));
        assert!(tables.contains_runtime_id(12));
        assert_eq!(tables.state(12).unwrap().offset(), 2);
        assert_eq!(tables.legacy_runtime_id(5, 3).unwrap(), 13);
        assert!(tables.contains_legacy_state(5, 7));
        assert!(!tables.contains_legacy_state(5, 8));
        assert!(matches!(tables.state(9), Err(BlockError::UnknownRuntimeId(9))));
        assert!(matches!(
            tables.legacy_runtime_id(5, 16),
            Err(BlockError::UnknownLegacyState { .. })
        ));
    }

    #[test]
    fn collisions_leave_tables_untouched() {
        let registry = RegistryId::new();
        let mut tables = RegistryTables::new();
        tables.insert(planks(registry, 10, 5)).unwrap();

        let overlapping = BlockTypeBuilder::new(Identifier::minecraft("other"))
            .legacy_id(6)
            .build(registry, |_, _| Ok((15, Some(0))))
            .unwrap();
        assert!(matches!(
            tables.insert(overlapping),
            Err(BlockError::DuplicateRegistration(_))
        ));
        assert!(!tables.contains_identifier(&Identifier::minecraft("other")));
        assert!(!tables.contains_legacy_id(6));

        assert!(tables.insert(planks(registry, 100, 7)).is_err(), "Duplicate identifier accepted.");
        assert_eq!(tables.state_count(), 8);
    }
}
