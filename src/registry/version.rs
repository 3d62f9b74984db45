use super::{
    description::{BlockDescription, FluidDescription, VersionDescription},
    tables::RegistryTables,
    BlockRegistry,
    GlobalBlockRegistry,
    RegistryConverter,
    RegistryId,
};
use crate::{
    block::{AnyTrait, BlockState, BlockType, BlockTypeBuilder, BoolTrait, EnumTrait, IntTrait, Trait, TraitKind, TraitRef},
    fluid::{FluidRegistry, MappedFluids, NoFluids},
    BlockError,
    StateId,
};
use log::{debug, info};
use qblocks_util::Identifier;
use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug, Formatter},
    io::Read,
    sync::Arc,
};

/// Legacy ids are twelve bits wide.
pub(crate) const LEGACY_ID_LIMIT: u16 = 4096;

/// Runtime ids listed in a description must be below this bound.
pub(crate) const RUNTIME_ID_LIMIT: StateId = 1 << 20;

/// The immutable block registry of one format version, built from a [`VersionDescription`].
///
/// Runtime ids are those listed in the description, so they are only meaningful within this
/// registry. Use [`to_global`](BlockRegistry::to_global) to translate them.
pub struct VersionBlockRegistry {
    id: RegistryId,
    version: String,
    tables: RegistryTables,
    air: BlockState,
    converter: RegistryConverter,
    fluids: Box<dyn FluidRegistry>,
}

impl VersionBlockRegistry {
    /// Parses a JSON description and builds the registry it describes.
    pub fn from_json(json: &str, global: &Arc<GlobalBlockRegistry>) -> Result<Self, BlockError> {
        let description: VersionDescription = serde_json::from_str(json)?;
        Self::from_description(&description, global)
    }

    /// Reads a JSON description and builds the registry it describes.
    pub fn from_reader<R: Read>(reader: R, global: &Arc<GlobalBlockRegistry>) -> Result<Self, BlockError> {
        let description: VersionDescription = serde_json::from_reader(reader)?;
        Self::from_description(&description, global)
    }

    /// Builds the registry described by the given description, along with its converter to the
    /// given global registry.
    pub fn from_description(
        description: &VersionDescription,
        global: &Arc<GlobalBlockRegistry>,
    ) -> Result<Self, BlockError>
    {
        let id = RegistryId::new();
        let mut tables = RegistryTables::new();
        let mut global_names = HashMap::new();
        let mut trait_names = HashMap::new();

        for (identifier, block) in &description.blocks {
            let ty = build_block_type(id, identifier, block)?;
            tables.insert(ty).map_err(|e| {
                BlockError::construction(format!("Version {}: {}", description.version, e))
            })?;

            if let Some(global_name) = &block.global {
                global_names.insert(identifier.clone(), global_name.clone());
            }
            if !block.global_traits.is_empty() {
                trait_names.insert(identifier.clone(), block.global_traits.clone());
            }
        }

        let air = tables
            .block_type(&Identifier::minecraft("air"))
            .map_err(|_| {
                BlockError::construction(format!(
                    "Version {} does not declare minecraft:air",
                    description.version
                ))
            })?
            .default_state();

        let fluids: Box<dyn FluidRegistry> = match &description.fluids {
            Some(fluids) => Box::new(build_fluids(&tables, &air, fluids)?),
            None => Box::new(NoFluids),
        };

        let converter = RegistryConverter::build(&tables, global, &global_names, &trait_names);

        info!(
            "Built block registry for version {} with {} block types and {} states",
            description.version,
            tables.types().len(),
            tables.state_count()
        );

        Ok(VersionBlockRegistry {
            id,
            version: description.version.clone(),
            tables,
            air,
            converter,
            fluids,
        })
    }

    /// The version this registry describes.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Every block type in declaration order.
    pub fn block_types(&self) -> &[Arc<BlockType>] {
        self.tables.types()
    }
}

impl Debug for VersionBlockRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionBlockRegistry")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("block_types", &self.tables.types().len())
            .field("states", &self.tables.state_count())
            .finish()
    }
}

// Picks the narrowest trait kind that can represent the declared values
fn infer_trait(identifier: &Identifier, name: &str, values: &[String]) -> Result<TraitRef, BlockError> {
    if values.is_empty() {
        return Err(BlockError::construction(format!(
            "Trait {} of {} has no values",
            name, identifier
        )));
    }

    if values.len() == 2 && values.iter().any(|v| v == "true") && values.iter().any(|v| v == "false") {
        return Ok(BoolTrait::new(name).erase());
    }

    let ints = values
        .iter()
        .map(|v| v.parse::<i32>().ok().filter(|i| i.to_string() == *v))
        .collect::<Option<Vec<_>>>();
    if let Some(mut ints) = ints {
        ints.sort_unstable();
        let contiguous = ints.windows(2).all(|pair| pair[0].checked_add(1) == Some(pair[1]));
        if contiguous && ints.len() > 1 {
            return Ok(IntTrait::new(name, ints[0], ints[ints.len() - 1])?.erase());
        }
    }

    Ok(EnumTrait::new(name, values.to_vec())?.erase())
}

fn build_block_type(
    registry: RegistryId,
    identifier: &Identifier,
    block: &BlockDescription,
) -> Result<Arc<BlockType>, BlockError>
{
    let legacy_id = block.legacy_id.ok_or_else(|| {
        BlockError::construction(format!("{} has no legacy id", identifier))
    })?;
    if legacy_id >= LEGACY_ID_LIMIT {
        return Err(BlockError::construction(format!(
            "Legacy id {} of {} is out of range",
            legacy_id, identifier
        )));
    }

    let traits = block
        .properties
        .iter()
        .map(|(name, values)| infer_trait(identifier, name, values))
        .collect::<Result<Vec<_>, _>>()?;
    let builder = BlockTypeBuilder::new(identifier.clone())
        .with_traits(traits.iter().cloned())
        .legacy_id(legacy_id);
    let cardinalities = builder.cardinalities()?;

    let mut factors = vec![1usize; traits.len()];
    let mut count = 1usize;
    for i in (0 .. traits.len()).rev() {
        factors[i] = count;
        count = count
            .checked_mul(cardinalities[i] as usize)
            .ok_or_else(|| BlockError::construction(format!("{} has too many states", identifier)))?;
    }

    if block.states.len() != count {
        return Err(BlockError::construction(format!(
            "{} declares {} states but its traits produce {}",
            identifier,
            block.states.len(),
            count
        )));
    }

    let min_id = block.states.iter().map(|state| state.id).min().unwrap_or(0);
    let mut slots: Vec<Option<(StateId, Option<u8>)>> = vec![None; count];
    let mut runtime_ids = HashSet::with_capacity(count);
    let mut metas = HashSet::new();
    let mut default_offset = None;

    for state in &block.states {
        if state.id >= RUNTIME_ID_LIMIT {
            return Err(BlockError::construction(format!(
                "Runtime id {} of {} is out of range",
                state.id, identifier
            )));
        }
        if state.properties.len() != traits.len() {
            return Err(BlockError::construction(format!(
                "State {} of {} does not give exactly one value per trait",
                state.id, identifier
            )));
        }

        let mut offset = 0;
        for (name, text) in &state.properties {
            let position = traits
                .iter()
                .position(|t| t.trait_name() == name)
                .ok_or_else(|| {
                    BlockError::construction(format!(
                        "State {} of {} names unknown trait {}",
                        state.id, identifier, name
                    ))
                })?;
            let index = traits[position].decode_index(text).map_err(|e| {
                BlockError::construction(format!("State {} of {}: {}", state.id, identifier, e))
            })?;
            offset += factors[position] * index;
        }

        if slots[offset].is_some() {
            return Err(BlockError::construction(format!(
                "{} declares the values of state {} more than once",
                identifier, state.id
            )));
        }
        if !runtime_ids.insert(state.id) {
            return Err(BlockError::construction(format!(
                "{} declares runtime id {} more than once",
                identifier, state.id
            )));
        }

        let meta = match state.meta {
            Some(meta) if meta < 16 => Some(meta),
            Some(meta) => {
                return Err(BlockError::construction(format!(
                    "Meta {} of state {} of {} is out of range",
                    meta, state.id, identifier
                )))
            }
            None => u8::try_from(state.id - min_id).ok().filter(|&meta| meta < 16),
        };
        if let Some(meta) = meta {
            if !metas.insert(meta) {
                return Err(BlockError::construction(format!(
                    "{} declares meta {} more than once",
                    identifier, meta
                )));
            }
        }

        slots[offset] = Some((state.id, meta));

        if state.default && default_offset.replace(offset).is_some() {
            return Err(BlockError::construction(format!(
                "{} has more than one default state",
                identifier
            )));
        }
    }

    let default_offset = default_offset.ok_or_else(|| {
        BlockError::construction(format!("{} has no default state", identifier))
    })?;

    builder
        .default_offset(default_offset)
        .build(registry, |offset, _| {
            slots[offset].ok_or_else(|| {
                BlockError::construction(format!("{} is missing state {}", identifier, offset))
            })
        })
}

fn build_fluids(
    tables: &RegistryTables,
    air: &BlockState,
    description: &FluidDescription,
) -> Result<MappedFluids, BlockError>
{
    let mut builder = MappedFluids::builder();

    // Liquid blocks are nothing but fluid, so they drain to air
    for identifier in &description.liquid_blocks {
        let ty = tables.block_type(identifier).map_err(|_| {
            BlockError::construction(format!("Liquid block {} is not declared", identifier))
        })?;
        for state in ty.states() {
            builder.map(state.runtime_id(), air.runtime_id(), state.runtime_id())?;
        }
    }

    if let Some(trait_name) = &description.waterlogged_trait {
        let fluid_identifier = description.waterlogged_fluid.as_ref().ok_or_else(|| {
            BlockError::construction(format!(
                "Waterlogging trait {} is declared without a fluid",
                trait_name
            ))
        })?;
        let fluid = tables
            .block_type(fluid_identifier)
            .map_err(|_| {
                BlockError::construction(format!("Fluid {} is not declared", fluid_identifier))
            })?
            .default_state()
            .runtime_id();

        for ty in tables.types() {
            let position = match ty.trait_position(trait_name) {
                Some(position) => position,
                None => continue,
            };
            if ty.traits()[position].trait_kind() != TraitKind::Bool {
                return Err(BlockError::construction(format!(
                    "Waterlogging trait {} of {} is not a boolean",
                    trait_name,
                    ty.identifier()
                )));
            }

            for state in ty.states() {
                if state.value_index(trait_name)? == 1 {
                    let drained = state.with_trait_index(trait_name, 0)?;
                    builder.map(state.runtime_id(), drained.runtime_id(), fluid)?;
                }
            }
        }
    }

    let fluids = builder.build();
    debug!("Mapped {} states containing fluid", fluids.len());
    Ok(fluids)
}

impl BlockRegistry for VersionBlockRegistry {
    fn id(&self) -> RegistryId {
        self.id
    }

    fn is_global(&self) -> bool {
        false
    }

    fn air(&self) -> BlockState {
        self.air.clone()
    }

    fn state_count(&self) -> usize {
        self.tables.state_count()
    }

    fn max_runtime_id(&self) -> StateId {
        self.tables.max_runtime_id()
    }

    fn contains_identifier(&self, identifier: &Identifier) -> bool {
        self.tables.contains_identifier(identifier)
    }

    fn contains_legacy_id(&self, legacy_id: u16) -> bool {
        self.tables.contains_legacy_id(legacy_id)
    }

    fn contains_legacy_state(&self, legacy_id: u16, meta: u8) -> bool {
        self.tables.contains_legacy_state(legacy_id, meta)
    }

    fn contains_runtime_id(&self, runtime_id: StateId) -> bool {
        self.tables.contains_runtime_id(runtime_id)
    }

    fn block_type(&self, identifier: &Identifier) -> Result<Arc<BlockType>, BlockError> {
        self.tables.block_type(identifier)
    }

    fn legacy_block_type(&self, legacy_id: u16) -> Result<Arc<BlockType>, BlockError> {
        self.tables.legacy_block_type(legacy_id)
    }

    fn state(&self, runtime_id: StateId) -> Result<BlockState, BlockError> {
        self.tables.state(runtime_id)
    }

    fn state_for_legacy(&self, legacy_id: u16, meta: u8) -> Result<BlockState, BlockError> {
        self.tables.state(self.tables.legacy_runtime_id(legacy_id, meta)?)
    }

    fn runtime_id_for_legacy(&self, legacy_id: u16, meta: u8) -> Result<StateId, BlockError> {
        self.tables.legacy_runtime_id(legacy_id, meta)
    }

    fn for_each_identifier(&self, f: &mut dyn FnMut(&Identifier)) {
        for ty in self.tables.types() {
            f(ty.identifier());
        }
    }

    fn for_each_legacy_id(&self, f: &mut dyn FnMut(u16, &Identifier)) {
        for (legacy_id, identifier) in self.tables.legacy_ids() {
            f(legacy_id, identifier);
        }
    }

    fn for_each_state(&self, f: &mut dyn FnMut(&BlockState)) {
        for ty in self.tables.types() {
            for state in ty.states() {
                f(&state);
            }
        }
    }

    fn to_global(&self) -> &RegistryConverter {
        &self.converter
    }

    fn fluids(&self) -> &dyn FluidRegistry {
        self.fluids.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::values::{Axis, AXIS, WATER_LEVEL, WOOD_TYPE};

    fn global() -> Arc<GlobalBlockRegistry> {
        let global = GlobalBlockRegistry::new();
        global.register(Identifier::minecraft("stone"), &[]).unwrap();
        global
            .register(Identifier::minecraft("log"), &[WOOD_TYPE.erase(), AXIS.erase()])
            .unwrap();
        global
            .register(Identifier::minecraft("water"), &[WATER_LEVEL.erase()])
            .unwrap();
        global
    }

    const DESCRIPTION: &str = r#"{
        "version": "test",
        "blocks": {
            "minecraft:air": {
                "legacy_id": 0,
                "states": [{ "id": 0, "default": true }]
            },
            "minecraft:stone": {
                "legacy_id": 1,
                "states": [{ "id": 16, "default": true }]
            },
            "minecraft:log": {
                "legacy_id": 17,
                "global_traits": { "variant": "wood_type" },
                "properties": { "axis": ["x", "y", "z", "none"], "variant": ["oak", "spruce"] },
                "states": [
                    { "id": 272, "properties": { "axis": "y", "variant": "oak" }, "default": true },
                    { "id": 273, "properties": { "axis": "y", "variant": "spruce" } },
                    { "id": 276, "properties": { "axis": "x", "variant": "oak" } },
                    { "id": 277, "properties": { "axis": "x", "variant": "spruce" } },
                    { "id": 280, "properties": { "axis": "z", "variant": "oak" } },
                    { "id": 281, "properties": { "axis": "z", "variant": "spruce" } },
                    { "id": 284, "properties": { "axis": "none", "variant": "oak" } },
                    { "id": 285, "properties": { "axis": "none", "variant": "spruce" } }
                ]
            },
            "minecraft:flowing_water": {
                "legacy_id": 8,
                "global": "minecraft:water",
                "global_traits": { "level": "water_level" },
                "properties": { "level": ["0", "1", "2", "3", "4", "5", "6", "7"] },
                "states": [
                    { "id": 128, "properties": { "level": "0" }, "default": true },
                    { "id": 129, "properties": { "level": "1" } },
                    { "id": 130, "properties": { "level": "2" } },
                    { "id": 131, "properties": { "level": "3" } },
                    { "id": 132, "properties": { "level": "4" } },
                    { "id": 133, "properties": { "level": "5" } },
                    { "id": 134, "properties": { "level": "6" } },
                    { "id": 135, "properties": { "level": "7" } }
                ]
            },
            "minecraft:wool": {
                "legacy_id": 35,
                "properties": { "colored": ["true", "false"] },
                "states": [
                    { "id": 560, "meta": 0, "properties": { "colored": "false" }, "default": true },
                    { "id": 561, "meta": 1, "properties": { "colored": "true" } }
                ]
            }
        },
        "fluids": { "liquid_blocks": ["minecraft:flowing_water"] }
    }"#;

    fn registry() -> VersionBlockRegistry {
        VersionBlockRegistry::from_json(DESCRIPTION, &global()).unwrap()
    }

    #[test]
    fn lookups_use_declared_ids() {
        let registry = registry();

        assert!(!registry.is_global());
        assert_eq!(registry.version(), "test");
        assert_eq!(registry.air().runtime_id(), 0);
        assert_eq!(registry.state_count(), 1 + 1 + 8 + 8 + 2);
        assert_eq!(registry.max_runtime_id(), 561);

        let log = registry.state_for_legacy(17, 4).unwrap();
        assert_eq!(log.runtime_id(), 276);
        assert_eq!(log.encoded_properties()["axis"], "x");
        assert_eq!(registry.default_state_for_legacy(17).unwrap().runtime_id(), 272);
        assert_eq!(registry.identifier_for_legacy(35).unwrap(), Identifier::minecraft("wool"));
        assert!(registry.contains_legacy_state(8, 7));
        assert!(!registry.contains_runtime_id(274));
        assert!(matches!(registry.state(274), Err(BlockError::UnknownRuntimeId(274))));
    }

    #[test]
    fn trait_kinds_inferred() {
        let registry = registry();
        let kind = |identifier: &str, name: &str| {
            registry
                .block_type(&identifier.parse().unwrap())
                .unwrap()
                .trait_by_name(name)
                .unwrap()
                .trait_kind()
        };

        assert_eq!(kind("flowing_water", "level"), TraitKind::Int { min: 0, max: 7 });
        assert_eq!(kind("wool", "colored"), TraitKind::Bool);
        assert_eq!(kind("log", "axis"), TraitKind::Enum);

        // Padded numbers stay text so their states still decode
        let padded = infer_trait(
            &Identifier::minecraft("padded"),
            "stage",
            &["01".to_owned(), "02".to_owned()],
        )
        .unwrap();
        assert_eq!(padded.trait_kind(), TraitKind::Enum);
        assert_eq!(padded.decode_index("02").unwrap(), 1);
    }

    #[test]
    fn converter_maps_by_trait_values() {
        let global = global();
        let registry = VersionBlockRegistry::from_json(DESCRIPTION, &global).unwrap();
        let converter = registry.to_global();

        let spruce_x = registry.state(277).unwrap();
        let converted = global.state(converter.to_global(277)).unwrap();
        assert_eq!(converted.identifier(), &Identifier::minecraft("log"));
        assert_eq!(converted.value(&*AXIS).unwrap(), Axis::X);
        assert_eq!(converted.encoded_properties()["wood_type"], "spruce");
        assert_eq!(converter.from_global(converted.runtime_id()), spruce_x.runtime_id());

        // "none" is not a global axis, so both variants keep the global default
        let oak_none = global.state(converter.to_global(284)).unwrap();
        assert_eq!(oak_none.value(&*AXIS).unwrap(), Axis::Y);
        assert_eq!(converter.from_global(oak_none.runtime_id()), 272);

        let water = global.state(converter.to_global(131)).unwrap();
        assert_eq!(water.identifier(), &Identifier::minecraft("water"));
        assert_eq!(water.encoded_properties()["water_level"], "3");

        // Wool has no global counterpart
        assert_eq!(converter.to_global(560), 0);
        assert_eq!(converter.to_global(12345), 0);
        assert_eq!(converter.from_global(12345), 0);
        assert!(!converter.is_identity());
    }

    #[test]
    fn liquid_blocks_carry_fluid() {
        let registry = registry();
        let fluids = registry.fluids();

        assert_eq!(fluids.extract_fluid(130), 130);
        assert_eq!(fluids.strip_fluid(130), 0);
        assert_eq!(fluids.add_fluid(0, 130), Some(130));
        assert_eq!(fluids.extract_fluid(16), 0);
    }

    #[test]
    fn meta_derived_from_ids() {
        let registry = registry();

        assert_eq!(registry.state(135).unwrap().legacy(), Some((8, 7)));
        assert_eq!(registry.state(285).unwrap().legacy(), Some((17, 13)));
        assert_eq!(registry.state(561).unwrap().legacy(), Some((35, 1)));
    }

    fn rejected(json: &str) -> bool {
        matches!(
            VersionBlockRegistry::from_json(json, &global()),
            Err(BlockError::Construction(_))
        )
    }

    #[test]
    fn malformed_descriptions_rejected() {
        let air = r#""minecraft:air": { "legacy_id": 0, "states": [{ "id": 0, "default": true }] }"#;

        // Missing legacy id
        assert!(rejected(&format!(
            r#"{{ "version": "t", "blocks": {{ {}, "stone": {{ "states": [{{ "id": 1, "default": true }}] }} }} }}"#,
            air
        )));
        // Legacy id out of range
        assert!(rejected(&format!(
            r#"{{ "version": "t", "blocks": {{ {}, "stone": {{ "legacy_id": 4096, "states": [{{ "id": 1, "default": true }}] }} }} }}"#,
            air
        )));
        // No default state
        assert!(rejected(&format!(
            r#"{{ "version": "t", "blocks": {{ {}, "stone": {{ "legacy_id": 1, "states": [{{ "id": 1 }}] }} }} }}"#,
            air
        )));
        // Two default states
        assert!(rejected(&format!(
            r#"{{ "version": "t", "blocks": {{ {}, "lit": {{ "legacy_id": 1, "properties": {{ "lit": ["true", "false"] }},
                "states": [{{ "id": 1, "default": true, "properties": {{ "lit": "true" }} }},
                           {{ "id": 2, "default": true, "properties": {{ "lit": "false" }} }}] }} }} }}"#,
            air
        )));
        // Repeated trait name
        assert!(rejected(&format!(
            r#"{{ "version": "t", "blocks": {{ {}, "lit": {{ "legacy_id": 1, "properties": {{ "lit": ["true", "false"], "lit": ["a"] }},
                "states": [{{ "id": 1, "default": true, "properties": {{ "lit": "true" }} }}] }} }} }}"#,
            air
        )));
        // Runtime id shared by two blocks
        assert!(rejected(&format!(
            r#"{{ "version": "t", "blocks": {{ {}, "stone": {{ "legacy_id": 1, "states": [{{ "id": 0, "default": true }}] }} }} }}"#,
            air
        )));
        // Runtime id out of range
        assert!(rejected(&format!(
            r#"{{ "version": "t", "blocks": {{ {}, "stone": {{ "legacy_id": 1, "states": [{{ "id": 900000000, "default": true }}] }} }} }}"#,
            air
        )));
        // Missing states
        assert!(rejected(&format!(
            r#"{{ "version": "t", "blocks": {{ {}, "lit": {{ "legacy_id": 1, "properties": {{ "lit": ["true", "false"] }},
                "states": [{{ "id": 1, "default": true, "properties": {{ "lit": "true" }} }}] }} }} }}"#,
            air
        )));
        // No air
        assert!(rejected(
            r#"{ "version": "t", "blocks": { "stone": { "legacy_id": 1, "states": [{ "id": 1, "default": true }] } } }"#
        ));
        // Not JSON
        assert!(rejected("{ version"));
    }
}
