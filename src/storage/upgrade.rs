use super::{cells, BlockStorage, FlattenedStorage, LegacyStorage};
use crate::BlockError;
use log::{debug, trace};

/// Converts a legacy storage into flattened layers of the same registry.
///
/// Each cell resolves to a state through the registry's legacy ids. States carrying fluid are
/// split with the registry's [`FluidRegistry`](crate::fluid::FluidRegistry): the block component
/// goes to the first layer and the fluid to the second, which is only created if some cell
/// carried fluid.
pub fn upgrade_legacy(legacy: &LegacyStorage) -> Result<(FlattenedStorage, Option<FlattenedStorage>), BlockError> {
    let registry = legacy.registry();
    let fluids = registry.fluids();

    let mut blocks = FlattenedStorage::new(registry.clone());
    let mut liquids: Option<FlattenedStorage> = None;
    let mut fluid_cells = 0usize;

    for (x, y, z) in cells() {
        let runtime_id = legacy.block_runtime_id(x, y, z)?;
        let fluid = fluids.extract_fluid(runtime_id);

        if fluid == 0 {
            blocks.set_block_runtime_id(x, y, z, runtime_id)?;
            continue;
        }

        let stripped = fluids.strip_fluid(runtime_id);
        trace!(
            "Split {} at ({}, {}, {}) into {} and fluid {}",
            runtime_id,
            x,
            y,
            z,
            stripped,
            fluid
        );

        blocks.set_block_runtime_id(x, y, z, stripped)?;
        liquids
            .get_or_insert_with(|| FlattenedStorage::new(registry.clone()))
            .set_block_runtime_id(x, y, z, fluid)?;
        fluid_cells += 1;
    }

    debug!(
        "Upgraded legacy storage to {} bits per block, {} cells with fluid",
        blocks.bits_per_block(),
        fluid_cells
    );

    Ok((blocks, liquids))
}
