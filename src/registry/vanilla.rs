use super::{BlockRegistry, GlobalBlockRegistry};
use crate::{
    block::{values::*, BlockType, Trait},
    BlockError,
};
use qblocks_util::Identifier;
use std::sync::Arc;

macro_rules! blocks {
    ($($field:ident => $path:literal [$($trait_:ident),* $(,)?]),* $(,)?) => {
        /// The standard block types of the global registry.
        #[allow(missing_docs)]
        #[derive(Clone, Debug)]
        pub struct Blocks {
            pub air: Arc<BlockType>,
            $(pub $field: Arc<BlockType>,)*
        }

        impl Blocks {
            /// Registers every standard block type with the given registry, in a fixed order
            /// so that runtime ids are stable between runs.
            pub fn register(registry: &GlobalBlockRegistry) -> Result<Self, BlockError> {
                Ok(Blocks {
                    air: registry.air().block_type().clone(),
                    $(
                        $field: registry.register(
                            Identifier::minecraft($path),
                            &[$($trait_.erase()),*],
                        )?,
                    )*
                })
            }
        }
    };
}

blocks! {
    button => "button" [BUTTON_TYPE, PRESSED, FACE, FACING],
    coarse_dirt => "coarse_dirt" [],
    dirt => "dirt" [],
    door => "door" [DOOR_TYPE, TOP, HINGE_SIDE, OPEN, POWERED],
    fence => "fence" [FENCE_TYPE, NORTH, EAST, SOUTH, WEST],
    fence_gate => "fence_gate" [FENCE_TYPE, FACING, IN_WALL, OPEN, POWERED],
    grass => "grass" [SNOWY],
    lava => "lava" [WATER_FALLING, WATER_LEVEL],
    leaves => "leaves" [LEAF_TYPE, DISTANCE, PERSISTENT],
    log => "log" [WOOD_TYPE, AXIS],
    planks => "planks" [WOOD_TYPE],
    pressure_plate => "pressure_plate" [BUTTON_TYPE, PRESSED],
    sapling => "sapling" [WOOD_TYPE, SAPLING_STAGE],
    sign => "sign" [WOOD_TYPE, FACING],
    slab => "slab" [SLAB_TYPE, SLAB_PART],
    stairs => "stairs" [SLAB_TYPE, FACING, UPSIDE_DOWN, STAIR_SHAPE],
    standing_sign => "standing_sign" [WOOD_TYPE, ROTATION],
    stone => "stone" [STONE_TYPE],
    trapdoor => "trapdoor" [DOOR_TYPE, FACING, OPEN, POWERED],
    water => "water" [WATER_FALLING, WATER_LEVEL],
    weighted_pressure_plate => "weighted_pressure_plate" [WEIGHTED_PRESSURE_PLATE_TYPE, POWER],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanilla_set_registers() {
        let global = GlobalBlockRegistry::new();
        let blocks = Blocks::register(&global).unwrap();

        assert_eq!(blocks.air.base_runtime_id(), 0);
        assert_eq!(blocks.button.base_runtime_id(), 1);
        assert_eq!(blocks.dirt.state_count(), 1);
        assert_eq!(blocks.log.state_count(), 8 * 3);
        assert_eq!(blocks.fence.state_count(), 9 * 16);
        assert_eq!(blocks.standing_sign.state_count(), 8 * 16);
        assert_eq!(blocks.water.state_count(), 16);

        let mut total = 0;
        global.for_each_state(&mut |_| total += 1);
        assert_eq!(total, global.state_count());
        assert_eq!(global.max_runtime_id() as usize + 1, total);

        assert!(matches!(
            Blocks::register(&global),
            Err(BlockError::DuplicateRegistration(_))
        ));
    }

    #[test]
    fn default_states_take_trait_defaults() {
        let global = GlobalBlockRegistry::new();
        let blocks = Blocks::register(&global).unwrap();

        let slab = blocks.slab.default_state();
        assert_eq!(slab.value(&*SLAB_TYPE).unwrap(), SlabType::SmoothStone);
        assert_eq!(blocks.log.default_state().value(&*AXIS).unwrap(), Axis::Y);
        assert_eq!(blocks.leaves.default_state().value(&*DISTANCE).unwrap(), 1);
    }
}
