use super::{tables::RegistryTables, BlockRegistry, RegistryConverter, RegistryId};
use crate::{
    block::{BlockState, BlockType, BlockTypeBuilder, TraitRef},
    fluid::{FluidRegistry, NoFluids},
    BlockError,
    StateId,
};
use log::debug;
use parking_lot::RwLock;
use qblocks_util::Identifier;
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

/// The single canonical, version-independent registry used to interchange block data across
/// format revisions.
///
/// Registration only ever appends: runtime ids are handed out monotonically and never reused,
/// and runtime id `0` is always `minecraft:air`. Readers never observe a partial registration.
pub struct GlobalBlockRegistry {
    id: RegistryId,
    tables: RwLock<RegistryTables>,
    air: BlockState,
    converter: RegistryConverter,
    fluids: NoFluids,
}

impl GlobalBlockRegistry {
    /// Creates a global registry containing only `minecraft:air`, at runtime id `0`.
    pub fn new() -> Arc<Self> {
        let id = RegistryId::new();
        let mut tables = RegistryTables::new();

        // A traitless type cannot fail to build, and the tables are empty
        let air = BlockTypeBuilder::new(Identifier::minecraft("air"))
            .build(id, |_, _| Ok((0, None)))
            .and_then(|ty| tables.insert(ty.clone()).map(|_| ty))
            .expect("Air registered into fresh tables")
            .default_state();

        Arc::new(GlobalBlockRegistry {
            id,
            tables: RwLock::new(tables),
            air,
            converter: RegistryConverter::identity(),
            fluids: NoFluids,
        })
    }

    /// Registers a new block type with the given traits, assigning its states the next free
    /// runtime ids in stride order.
    pub fn register(&self, identifier: Identifier, traits: &[TraitRef]) -> Result<Arc<BlockType>, BlockError> {
        self.register_builder(BlockTypeBuilder::new(identifier).with_traits(traits.iter().cloned()))
    }

    /// Registers a block type declared with a builder.
    pub fn register_builder(&self, builder: BlockTypeBuilder) -> Result<Arc<BlockType>, BlockError> {
        let mut tables = self.tables.write();

        if tables.contains_identifier(builder.identifier()) {
            return Err(BlockError::DuplicateRegistration(
                builder.identifier().to_string(),
            ));
        }

        let base = tables.runtime_id_limit() as StateId;
        let ty = builder.build(self.id, |offset, _| {
            base.checked_add(offset as StateId)
                .map(|runtime_id| (runtime_id, None))
                .ok_or_else(|| BlockError::construction("Global runtime ids exhausted"))
        })?;
        tables.insert(ty.clone())?;

        debug!(
            "Registered {} with {} states at runtime ids {}..{}",
            ty.identifier(),
            ty.state_count(),
            base,
            base as usize + ty.state_count()
        );

        Ok(ty)
    }

    /// A snapshot of every registered block type in registration order.
    pub fn block_types(&self) -> Vec<Arc<BlockType>> {
        self.tables.read().types().to_vec()
    }
}

impl Debug for GlobalBlockRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("GlobalBlockRegistry")
            .field("id", &self.id)
            .field("block_types", &tables.types().len())
            .field("states", &tables.state_count())
            .finish()
    }
}

impl BlockRegistry for GlobalBlockRegistry {
    fn id(&self) -> RegistryId {
        self.id
    }

    fn is_global(&self) -> bool {
        true
    }

    fn air(&self) -> BlockState {
        self.air.clone()
    }

    fn state_count(&self) -> usize {
        self.tables.read().state_count()
    }

    fn max_runtime_id(&self) -> StateId {
        self.tables.read().max_runtime_id()
    }

    fn contains_identifier(&self, identifier: &Identifier) -> bool {
        self.tables.read().contains_identifier(identifier)
    }

    fn contains_legacy_id(&self, legacy_id: u16) -> bool {
        self.tables.read().contains_legacy_id(legacy_id)
    }

    fn contains_legacy_state(&self, legacy_id: u16, meta: u8) -> bool {
        self.tables.read().contains_legacy_state(legacy_id, meta)
    }

    fn contains_runtime_id(&self, runtime_id: StateId) -> bool {
        self.tables.read().contains_runtime_id(runtime_id)
    }

    fn block_type(&self, identifier: &Identifier) -> Result<Arc<BlockType>, BlockError> {
        self.tables.read().block_type(identifier)
    }

    fn legacy_block_type(&self, legacy_id: u16) -> Result<Arc<BlockType>, BlockError> {
        self.tables.read().legacy_block_type(legacy_id)
    }

    fn state(&self, runtime_id: StateId) -> Result<BlockState, BlockError> {
        self.tables.read().state(runtime_id)
    }

    fn state_for_legacy(&self, legacy_id: u16, meta: u8) -> Result<BlockState, BlockError> {
        let tables = self.tables.read();
        let runtime_id = tables.legacy_runtime_id(legacy_id, meta)?;
        tables.state(runtime_id)
    }

    fn runtime_id_for_legacy(&self, legacy_id: u16, meta: u8) -> Result<StateId, BlockError> {
        self.tables.read().legacy_runtime_id(legacy_id, meta)
    }

    // Callbacks run on a snapshot so no lock is held while client code runs

    fn for_each_identifier(&self, f: &mut dyn FnMut(&Identifier)) {
        for ty in self.block_types() {
            f(ty.identifier());
        }
    }

    fn for_each_legacy_id(&self, f: &mut dyn FnMut(u16, &Identifier)) {
        let legacy = self
            .tables
            .read()
            .legacy_ids()
            .map(|(legacy_id, identifier)| (legacy_id, identifier.clone()))
            .collect::<Vec<_>>();

        for (legacy_id, identifier) in legacy {
            f(legacy_id, &identifier);
        }
    }

    fn for_each_state(&self, f: &mut dyn FnMut(&BlockState)) {
        for ty in self.block_types() {
            for state in ty.states() {
                f(&state);
            }
        }
    }

    fn to_global(&self) -> &RegistryConverter {
        &self.converter
    }

    fn fluids(&self) -> &dyn FluidRegistry {
        &self.fluids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{
        values::{AXIS, WOOD_TYPE},
        Trait,
    };
    use std::thread;

    #[test]
    fn air_is_runtime_id_zero() {
        let global = GlobalBlockRegistry::new();

        assert_eq!(global.air().runtime_id(), 0);
        assert_eq!(global.air().identifier(), &Identifier::minecraft("air"));
        assert_eq!(global.state_count(), 1);
        assert!(global.is_global());
    }

    #[test]
    fn registration_is_append_only() {
        let global = GlobalBlockRegistry::new();
        let log = global
            .register(Identifier::minecraft("log"), &[WOOD_TYPE.erase(), AXIS.erase()])
            .unwrap();
        let stone = global.register(Identifier::minecraft("stone"), &[]).unwrap();

        assert_eq!(log.base_runtime_id(), 1);
        assert_eq!(stone.base_runtime_id(), 25);
        assert_eq!(global.max_runtime_id(), 25);
        assert_eq!(global.state(25).unwrap().identifier(), stone.identifier());
        assert_eq!(global.default_state(log.identifier()).unwrap(), log.default_state());

        assert!(matches!(
            global.register(Identifier::minecraft("stone"), &[]),
            Err(BlockError::DuplicateRegistration(_))
        ));
        assert_eq!(global.max_runtime_id(), 25, "Failed registration allocated ids.");
    }

    #[test]
    fn lookups_fail_on_misses() {
        let global = GlobalBlockRegistry::new();

        assert!(matches!(
            global.block_type(&Identifier::minecraft("missing")),
            Err(BlockError::UnknownIdentifier(_))
        ));
        assert!(matches!(global.state(1), Err(BlockError::UnknownRuntimeId(1))));
        assert!(matches!(
            global.state_for_legacy(1, 0),
            Err(BlockError::UnknownLegacyState { .. })
        ));
        assert!(matches!(global.identifier_for_legacy(1), Err(BlockError::UnknownLegacyId(1))));
    }

    #[test]
    fn callbacks_may_reenter() {
        let global = GlobalBlockRegistry::new();
        global.register(Identifier::minecraft("stone"), &[]).unwrap();

        let mut count = 0;
        global.for_each_state(&mut |state| {
            // Reading inside the callback must not deadlock with a queued writer
            assert!(global.contains_runtime_id(state.runtime_id()));
            count += 1;
        });
        assert_eq!(count, 2);

        let mut names = Vec::new();
        global.for_each_identifier(&mut |identifier| {
            if identifier.path == "air" {
                global.register(Identifier::minecraft("dirt"), &[]).unwrap();
            }
            names.push(identifier.to_string());
        });
        assert_eq!(names, vec!["minecraft:air", "minecraft:stone"]);
        assert!(global.contains_identifier(&Identifier::minecraft("dirt")));
    }

    #[test]
    fn concurrent_registration() {
        let global = GlobalBlockRegistry::new();

        let handles = (0 .. 8)
            .map(|i| {
                let global = global.clone();
                thread::spawn(move || {
                    global
                        .register(Identifier::minecraft(&format!("block_{}", i)), &[AXIS.erase()])
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            let ty = handle.join().unwrap();
            for state in ty.states() {
                assert_eq!(global.state(state.runtime_id()).unwrap(), state);
            }
        }
        assert_eq!(global.state_count(), 1 + 8 * 3);
        assert_eq!(global.max_runtime_id(), 24);
    }
}
