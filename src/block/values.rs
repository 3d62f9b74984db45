//! Value enumerations and the standard set of traits shared by the vanilla block types.

use super::traits::{BoolTrait, EnumTrait, IntTrait, TraitEnum};
use once_cell::sync::Lazy;

macro_rules! trait_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            /// Every value in declaration order.
            pub const VALUES: &'static [$name] = &[$($name::$variant),*];
        }

        impl TraitEnum for $name {
            fn name(&self) -> &str {
                match self {
                    $($name::$variant => $text),*
                }
            }
        }
    };
}

trait_enum! {
    /// A coordinate axis.
    Axis { X => "x", Y => "y", Z => "z" }
}

trait_enum! {
    /// One of the six block faces.
    Direction {
        Down => "down",
        Up => "up",
        North => "north",
        South => "south",
        West => "west",
        East => "east",
    }
}

trait_enum! {
    /// The surface a button or lever is attached to.
    BlockFace { Floor => "floor", Wall => "wall", Ceiling => "ceiling" }
}

trait_enum! {
    /// Materials buttons and pressure plates are made of.
    ButtonType {
        Oak => "oak",
        Spruce => "spruce",
        Birch => "birch",
        Jungle => "jungle",
        Acacia => "acacia",
        DarkOak => "dark_oak",
        Crimson => "crimson",
        Warped => "warped",
        Stone => "stone",
        PolishedBlackstone => "polished_blackstone",
    }
}

trait_enum! {
    /// Materials doors and trapdoors are made of.
    DoorType {
        Oak => "oak",
        Spruce => "spruce",
        Birch => "birch",
        Jungle => "jungle",
        Acacia => "acacia",
        DarkOak => "dark_oak",
        Crimson => "crimson",
        Warped => "warped",
        Iron => "iron",
    }
}

trait_enum! {
    /// Materials fences and fence gates are made of.
    FenceType {
        Oak => "oak",
        Spruce => "spruce",
        Birch => "birch",
        Jungle => "jungle",
        Acacia => "acacia",
        DarkOak => "dark_oak",
        Crimson => "crimson",
        Warped => "warped",
        NetherBrick => "nether_brick",
    }
}

trait_enum! {
    /// The side a door's hinge is on.
    HingeSide { Left => "left", Right => "right" }
}

trait_enum! {
    /// Tree species for leaves.
    LeafType {
        Oak => "oak",
        Spruce => "spruce",
        Birch => "birch",
        Jungle => "jungle",
        Acacia => "acacia",
        DarkOak => "dark_oak",
    }
}

trait_enum! {
    /// Which half of a block space a slab occupies.
    SlabPart { Bottom => "bottom", Top => "top", Double => "double" }
}

trait_enum! {
    /// Materials slabs and stairs are made of.
    SlabType {
        Acacia => "acacia",
        Andesite => "andesite",
        Birch => "birch",
        Blackstone => "blackstone",
        Brick => "brick",
        Cobblestone => "cobblestone",
        Crimson => "crimson",
        CutRedSandstone => "cut_red_sandstone",
        CutSandstone => "cut_sandstone",
        DarkOak => "dark_oak",
        DarkPrismarine => "dark_prismarine",
        Diorite => "diorite",
        EndStone => "end_stone",
        Granite => "granite",
        Jungle => "jungle",
        MossyCobblestone => "mossy_cobblestone",
        MossyStoneBrick => "mossy_stone_brick",
        NetherBrick => "nether_brick",
        Oak => "oak",
        PetrifiedOak => "petrified_oak",
        PolishedAndesite => "polished_andesite",
        PolishedBlackstone => "polished_blackstone",
        PolishedBlackstoneBrick => "polished_blackstone_brick",
        PolishedDiorite => "polished_diorite",
        PolishedGranite => "polished_granite",
        Prismarine => "prismarine",
        PrismarineBrick => "prismarine_brick",
        Purpur => "purpur",
        Quartz => "quartz",
        RedNetherBrick => "red_nether_brick",
        RedSandstone => "red_sandstone",
        Sandstone => "sandstone",
        SmoothQuartz => "smooth_quartz",
        SmoothRedSandstone => "smooth_red_sandstone",
        SmoothSandstone => "smooth_sandstone",
        SmoothStone => "smooth_stone",
        Spruce => "spruce",
        Stone => "stone",
        StoneBrick => "stone_brick",
        Warped => "warped",
    }
}

trait_enum! {
    /// The connection shape of a stair block.
    StairShape {
        Straight => "straight",
        InnerLeft => "inner_left",
        InnerRight => "inner_right",
        OuterLeft => "outer_left",
        OuterRight => "outer_right",
    }
}

trait_enum! {
    /// Natural stone variants.
    StoneType {
        Stone => "stone",
        Granite => "granite",
        PolishedGranite => "polished_granite",
        Diorite => "diorite",
        PolishedDiorite => "polished_diorite",
        Andesite => "andesite",
        PolishedAndesite => "polished_andesite",
    }
}

trait_enum! {
    /// Weighted pressure plate variants.
    WeightedPressurePlateType { Light => "light", Heavy => "heavy" }
}

trait_enum! {
    /// Wood species.
    WoodType {
        Oak => "oak",
        Spruce => "spruce",
        Birch => "birch",
        Jungle => "jungle",
        Acacia => "acacia",
        DarkOak => "dark_oak",
        Crimson => "crimson",
        Warped => "warped",
    }
}

const HORIZONTAL: &[Direction] = &[
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

#[allow(missing_docs)]
pub static NORTH: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("north"));
#[allow(missing_docs)]
pub static SOUTH: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("south"));
#[allow(missing_docs)]
pub static EAST: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("east"));
#[allow(missing_docs)]
pub static WEST: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("west"));
/// The axis a log or pillar is aligned to, defaulting to `y`.
pub static AXIS: Lazy<EnumTrait<Axis>> =
    Lazy::new(|| EnumTrait::new_unchecked("axis", Axis::VALUES, 1));
/// Any of the six faces.
pub static DIRECTION: Lazy<EnumTrait<Direction>> =
    Lazy::new(|| EnumTrait::new_unchecked("direction", Direction::VALUES, 0));
#[allow(missing_docs)]
pub static FACE: Lazy<EnumTrait<BlockFace>> =
    Lazy::new(|| EnumTrait::new_unchecked("face", BlockFace::VALUES, 0));
/// One of the four horizontal directions, defaulting to `north`.
pub static FACING: Lazy<EnumTrait<Direction>> =
    Lazy::new(|| EnumTrait::new_unchecked("facing", HORIZONTAL, 0));
/// Sixteen-step rotation of standing signs and banners.
pub static ROTATION: Lazy<IntTrait> = Lazy::new(|| IntTrait::new_unchecked("rotation", 0, 15, 0));
#[allow(missing_docs)]
pub static BUTTON_TYPE: Lazy<EnumTrait<ButtonType>> =
    Lazy::new(|| EnumTrait::new_unchecked("button_type", ButtonType::VALUES, 0));
/// Distance from the nearest log, used by leaves decay.
pub static DISTANCE: Lazy<IntTrait> = Lazy::new(|| IntTrait::new_unchecked("distance", 1, 7, 1));
#[allow(missing_docs)]
pub static DOOR_TYPE: Lazy<EnumTrait<DoorType>> =
    Lazy::new(|| EnumTrait::new_unchecked("door_type", DoorType::VALUES, 0));
#[allow(missing_docs)]
pub static FENCE_TYPE: Lazy<EnumTrait<FenceType>> =
    Lazy::new(|| EnumTrait::new_unchecked("fence_type", FenceType::VALUES, 0));
#[allow(missing_docs)]
pub static HINGE_SIDE: Lazy<EnumTrait<HingeSide>> =
    Lazy::new(|| EnumTrait::new_unchecked("hinge_side", HingeSide::VALUES, 0));
#[allow(missing_docs)]
pub static IN_WALL: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("in_wall"));
#[allow(missing_docs)]
pub static LEAF_TYPE: Lazy<EnumTrait<LeafType>> =
    Lazy::new(|| EnumTrait::new_unchecked("leaf_type", LeafType::VALUES, 0));
#[allow(missing_docs)]
pub static OPEN: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("open"));
#[allow(missing_docs)]
pub static PERSISTENT: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("persistent"));
/// Redstone signal strength.
pub static POWER: Lazy<IntTrait> = Lazy::new(|| IntTrait::new_unchecked("power", 0, 15, 0));
#[allow(missing_docs)]
pub static POWERED: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("powered"));
#[allow(missing_docs)]
pub static PRESSED: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("pressed"));
#[allow(missing_docs)]
pub static SAPLING_STAGE: Lazy<IntTrait> =
    Lazy::new(|| IntTrait::new_unchecked("sapling_stage", 0, 1, 0));
#[allow(missing_docs)]
pub static SLAB_PART: Lazy<EnumTrait<SlabPart>> =
    Lazy::new(|| EnumTrait::new_unchecked("slab_part", SlabPart::VALUES, 0));
/// Slab and stair material, defaulting to `smooth_stone`.
pub static SLAB_TYPE: Lazy<EnumTrait<SlabType>> =
    Lazy::new(|| EnumTrait::new_unchecked("slab_type", SlabType::VALUES, 35));
#[allow(missing_docs)]
pub static SNOWY: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("snowy"));
#[allow(missing_docs)]
pub static STAIR_SHAPE: Lazy<EnumTrait<StairShape>> =
    Lazy::new(|| EnumTrait::new_unchecked("stair_shape", StairShape::VALUES, 0));
#[allow(missing_docs)]
pub static STONE_TYPE: Lazy<EnumTrait<StoneType>> =
    Lazy::new(|| EnumTrait::new_unchecked("stone_type", StoneType::VALUES, 0));
/// Whether this is the upper half of a two-block-tall block.
pub static TOP: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("top"));
#[allow(missing_docs)]
pub static UPSIDE_DOWN: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("upside_down"));
#[allow(missing_docs)]
pub static WATER_FALLING: Lazy<BoolTrait> = Lazy::new(|| BoolTrait::new("water_falling"));
/// Fluid level, 0 being a source block.
pub static WATER_LEVEL: Lazy<IntTrait> =
    Lazy::new(|| IntTrait::new_unchecked("water_level", 0, 7, 0));
#[allow(missing_docs)]
pub static WEIGHTED_PRESSURE_PLATE_TYPE: Lazy<EnumTrait<WeightedPressurePlateType>> =
    Lazy::new(|| {
        EnumTrait::new_unchecked(
            "weighted_pressure_plate_type",
            WeightedPressurePlateType::VALUES,
            0,
        )
    });
#[allow(missing_docs)]
pub static WOOD_TYPE: Lazy<EnumTrait<WoodType>> =
    Lazy::new(|| EnumTrait::new_unchecked("wood_type", WoodType::VALUES, 0));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::traits::Trait;

    fn check_enum<E: TraitEnum>(trait_: &EnumTrait<E>) {
        EnumTrait::with_default(trait_.name(), trait_.values().to_vec(), trait_.default_value())
            .unwrap_or_else(|e| panic!("Invalid standard trait {}: {}", trait_.name(), e));
    }

    fn check_int(trait_: &IntTrait) {
        IntTrait::with_default(
            trait_.name(),
            trait_.min(),
            trait_.max(),
            trait_.default_value(),
        )
        .unwrap_or_else(|e| panic!("Invalid standard trait {}: {}", trait_.name(), e));
    }

    #[test]
    fn standard_traits_are_valid() {
        check_enum(&*AXIS);
        check_enum(&*DIRECTION);
        check_enum(&*FACE);
        check_enum(&*FACING);
        check_enum(&*BUTTON_TYPE);
        check_enum(&*DOOR_TYPE);
        check_enum(&*FENCE_TYPE);
        check_enum(&*HINGE_SIDE);
        check_enum(&*LEAF_TYPE);
        check_enum(&*SLAB_PART);
        check_enum(&*SLAB_TYPE);
        check_enum(&*STAIR_SHAPE);
        check_enum(&*STONE_TYPE);
        check_enum(&*WEIGHTED_PRESSURE_PLATE_TYPE);
        check_enum(&*WOOD_TYPE);

        check_int(&ROTATION);
        check_int(&DISTANCE);
        check_int(&POWER);
        check_int(&SAPLING_STAGE);
        check_int(&WATER_LEVEL);
    }

    #[test]
    fn standard_defaults() {
        assert_eq!(AXIS.default_value(), Axis::Y);
        assert_eq!(FACING.default_value(), Direction::North);
        assert_eq!(SLAB_TYPE.default_value(), SlabType::SmoothStone);
        assert_eq!(SLAB_TYPE.len(), 40);
        assert_eq!(DISTANCE.len(), 7);
        assert_eq!(POWER.len(), 16);
        assert_eq!(WATER_LEVEL.len(), 8);
    }
}
