use qblocks::{
    block::{values::*, Trait},
    registry::{BlockRegistry, VersionRegistries},
    BlockError,
    Identifier,
};
use std::path::PathBuf;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

#[test]
fn fixture_registry_lookups() {
    let (global, _) = qblocks::init().unwrap();
    let registries = VersionRegistries::new(global, Some(data_dir()));
    let registry = registries.get("1.12.2").unwrap();

    assert_eq!(registry.version(), "1.12.2");
    assert!(!registry.is_global());
    assert_eq!(registry.air().runtime_id(), 0);
    assert_eq!(registry.legacy_id(&Identifier::minecraft("log")).unwrap(), 17);
    assert_eq!(registry.identifier_for_legacy(35).unwrap(), Identifier::minecraft("wool"));

    let granite = registry.state_for_legacy(1, 1).unwrap();
    assert_eq!(granite.runtime_id(), 17);
    assert_eq!(granite.encoded_properties()["variant"], "granite");

    let birch_x = registry.state_for_legacy(17, 1 << 2 | 2).unwrap();
    assert_eq!(birch_x.encoded_properties()["axis"], "x");
    assert_eq!(birch_x.encoded_properties()["variant"], "birch");

    assert!(matches!(
        registry.state_for_legacy(1, 9),
        Err(BlockError::UnknownLegacyState { legacy_id: 1, meta: 9 })
    ));
    assert!(matches!(registry.legacy_block_type(4), Err(BlockError::UnknownLegacyId(4))));
}

#[test]
fn conversion_through_global_numbering() {
    let (global, blocks) = qblocks::init().unwrap();
    let registries = VersionRegistries::new(global.clone(), Some(data_dir()));
    let registry = registries.get("1.12.2").unwrap();
    let converter = registry.to_global();

    // Exact equivalents survive a round trip
    let global_granite = blocks
        .stone
        .default_state()
        .with_trait(&*STONE_TYPE, StoneType::Granite)
        .unwrap();
    assert_eq!(converter.to_global(17), global_granite.runtime_id());
    assert_eq!(converter.from_global(global_granite.runtime_id()), 17);

    let global_spruce = blocks
        .planks
        .default_state()
        .with_trait(&*WOOD_TYPE, WoodType::Spruce)
        .unwrap();
    assert_eq!(converter.to_global(81), global_spruce.runtime_id());
    assert_eq!(converter.from_global(global_spruce.runtime_id()), 81);

    // Trait values the global type cannot represent keep its defaults
    let bark = registry.state_for_legacy(17, 3 << 2 | 1).unwrap();
    let global_bark = global.state(converter.to_global(bark.runtime_id())).unwrap();
    assert_eq!(global_bark.value(&*WOOD_TYPE).unwrap(), WoodType::Spruce);
    assert_eq!(global_bark.value(&*AXIS).unwrap(), Axis::Y);

    let flowing = registry.state_for_legacy(9, 12).unwrap();
    let global_flowing = global.state(converter.to_global(flowing.runtime_id())).unwrap();
    assert_eq!(global_flowing.block_type().identifier(), &Identifier::minecraft("water"));
    assert_eq!(global_flowing.value(&*WATER_LEVEL).unwrap(), 0);

    // Blocks without a global equivalent become air
    assert_eq!(converter.to_global(560), 0);
    assert_eq!(converter.to_global(4000), 0);

    // Global states without a version equivalent become the version's air
    let button = blocks.button.default_state();
    assert_eq!(converter.from_global(button.runtime_id()), registry.air().runtime_id());
}

#[test]
fn aliases_share_registries() {
    let (global, _) = qblocks::init().unwrap();
    let mut registries = VersionRegistries::new(global, Some(data_dir()));
    registries.alias("1.12.1", "1.12.2");

    let aliased = registries.get("1.12.1").unwrap();
    let direct = registries.get("1.12.2").unwrap();
    assert!(std::sync::Arc::ptr_eq(&aliased, &direct));

    assert!(matches!(registries.get("1.7.10"), Err(BlockError::Io(_))));
}

#[test]
fn fluids_from_description() {
    let (global, _) = qblocks::init().unwrap();
    let registries = VersionRegistries::new(global, Some(data_dir()));
    let registry = registries.get("1.12.2").unwrap();
    let fluids = registry.fluids();

    for legacy_id in [9, 11] {
        for meta in 0 .. 16 {
            let liquid = registry.runtime_id_for_legacy(legacy_id, meta).unwrap();
            assert_eq!(fluids.extract_fluid(liquid), liquid);
            assert_eq!(fluids.strip_fluid(liquid), registry.air().runtime_id());
            assert_eq!(
                fluids.add_fluid(fluids.strip_fluid(liquid), fluids.extract_fluid(liquid)),
                Some(liquid)
            );
        }
    }

    let stone = registry.runtime_id_for_legacy(1, 0).unwrap();
    assert_eq!(fluids.extract_fluid(stone), 0);
    assert_eq!(fluids.strip_fluid(stone), stone);
}
