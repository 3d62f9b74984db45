mod block_type;
mod state;
/// Trait domains: booleans, integer ranges and enumerations.
pub mod traits;
/// The standard trait values and traits shared by the vanilla block types.
pub mod values;

pub use block_type::{BlockType, BlockTypeBuilder, MAX_TRAITS};
pub use state::BlockState;
pub use traits::{AnyTrait, BoolTrait, EnumTrait, IntTrait, Trait, TraitEnum, TraitKind, TraitRef};
pub use values::{
    Axis,
    BlockFace,
    ButtonType,
    Direction,
    DoorType,
    FenceType,
    HingeSide,
    LeafType,
    SlabPart,
    SlabType,
    StairShape,
    StoneType,
    WeightedPressurePlateType,
    WoodType,
};
