use super::{
    state::BlockState,
    traits::{AnyTrait, TraitRef},
};
use crate::{registry::RegistryId, BlockError, StateId};
use log::trace;
use qblocks_util::Identifier;
use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};
use tinyvec::ArrayVec;

/// The maximum number of traits a block type may declare.
pub const MAX_TRAITS: usize = 16;

pub(crate) type ValueIndices = ArrayVec<[u16; MAX_TRAITS]>;

pub(crate) struct StateData {
    pub(crate) runtime_id: StateId,
    pub(crate) legacy: Option<(u16, u8)>,
    pub(crate) indices: ValueIndices,
}

/// A specific block type, not to be confused with a block state which specifies variants of a
/// type. A block type owns its entire state space, which is built once when the type is
/// registered.
///
/// States are stored in stride order: the first declared trait is the most significant, so the
/// state at flat offset `Σ factor[i] * index[i]` takes value `index[i]` for every trait `i`.
pub struct BlockType {
    registry: RegistryId,
    identifier: Identifier,
    legacy_id: Option<u16>,
    traits: Box<[TraitRef]>,
    factors: Box<[u32]>,
    // Prefix sums of the trait cardinalities, used to address the alternate tables
    alternate_bases: Box<[u32]>,
    alternate_stride: u32,
    alternates: Box<[u32]>,
    states: Box<[StateData]>,
    default_offset: u32,
}

impl BlockType {
    /// The identifier of this block type.
    #[inline]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The legacy id of this block type, if it has one.
    #[inline]
    pub fn legacy_id(&self) -> Option<u16> {
        self.legacy_id
    }

    /// The registry this block type belongs to.
    #[inline]
    pub fn registry_id(&self) -> RegistryId {
        self.registry
    }

    /// The traits of this block type in declaration order.
    #[inline]
    pub fn traits(&self) -> &[TraitRef] {
        &self.traits
    }

    /// Returns the trait with the given name.
    pub fn trait_by_name(&self, name: &str) -> Option<&TraitRef> {
        self.traits.iter().find(|t| t.trait_name() == name)
    }

    /// Returns the declaration index of the trait with the given name.
    pub fn trait_position(&self, name: &str) -> Option<usize> {
        self.traits.iter().position(|t| t.trait_name() == name)
    }

    /// The number of states of this block type, which is the product of the cardinalities of
    /// its traits.
    #[inline]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// The runtime id of the first state in stride order.
    #[inline]
    pub fn base_runtime_id(&self) -> StateId {
        self.states[0].runtime_id
    }

    /// The state taken when no trait value is specified.
    #[inline]
    pub fn default_state(self: &Arc<Self>) -> BlockState {
        BlockState::new(self.clone(), self.default_offset)
    }

    /// Returns the state at the given stride-order offset.
    pub fn state_at(self: &Arc<Self>, offset: usize) -> Option<BlockState> {
        if offset < self.states.len() {
            Some(BlockState::new(self.clone(), offset as u32))
        } else {
            None
        }
    }

    /// Iterates over every state of this block type in stride order.
    pub fn states(self: &Arc<Self>) -> impl Iterator<Item = BlockState> + '_ {
        (0 .. self.states.len() as u32).map(move |offset| BlockState::new(self.clone(), offset))
    }

    /// Resolves a state from textual trait values. Traits that are not named take their default
    /// value.
    pub fn state_from_properties<I, K, V>(self: &Arc<Self>, properties: I) -> Result<BlockState, BlockError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut offset = self.default_offset;

        for (name, text) in properties {
            let (name, text) = (name.as_ref(), text.as_ref());
            let position = self.trait_position(name).ok_or_else(|| {
                BlockError::invalid(format!("{} has no trait named {}", self.identifier, name))
            })?;
            let index = self.traits[position].decode_index(text)?;
            offset = self.alternate(offset, position, index);
        }

        Ok(BlockState::new(self.clone(), offset))
    }

    #[inline]
    pub(crate) fn state_data(&self, offset: u32) -> &StateData {
        &self.states[offset as usize]
    }

    #[inline]
    pub(crate) fn default_offset(&self) -> u32 {
        self.default_offset
    }

    // Returns the offset of the state identical to the given one except for the value of the
    // given trait
    #[inline]
    pub(crate) fn alternate(&self, offset: u32, trait_index: usize, value_index: usize) -> u32 {
        let base = offset as usize * self.alternate_stride as usize
            + self.alternate_bases[trait_index] as usize;
        self.alternates[base + value_index]
    }

    #[inline]
    pub(crate) fn factor(&self, trait_index: usize) -> u32 {
        self.factors[trait_index]
    }
}

impl Display for BlockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.identifier, f)
    }
}

impl Debug for BlockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockType")
            .field("identifier", &self.identifier)
            .field("traits", &self.traits)
            .field("states", &self.states.len())
            .finish()
    }
}

/// Declares a block type before its states are built by a registry.
#[derive(Clone, Debug)]
pub struct BlockTypeBuilder {
    identifier: Identifier,
    traits: Vec<TraitRef>,
    legacy_id: Option<u16>,
    default_offset: Option<usize>,
}

impl BlockTypeBuilder {
    /// Starts a block type with the given identifier and no traits.
    pub fn new(identifier: Identifier) -> Self {
        BlockTypeBuilder {
            identifier,
            traits: Vec::new(),
            legacy_id: None,
            default_offset: None,
        }
    }

    /// Appends a trait. Traits declared first vary slowest in stride order.
    pub fn with_trait(mut self, trait_: TraitRef) -> Self {
        self.traits.push(trait_);
        self
    }

    /// Appends several traits.
    pub fn with_traits<I: IntoIterator<Item = TraitRef>>(mut self, traits: I) -> Self {
        self.traits.extend(traits);
        self
    }

    /// Sets the legacy id of the block type.
    pub fn legacy_id(mut self, legacy_id: u16) -> Self {
        self.legacy_id = Some(legacy_id);
        self
    }

    /// Overrides the default state with the state at the given stride-order offset.
    pub(crate) fn default_offset(mut self, offset: usize) -> Self {
        self.default_offset = Some(offset);
        self
    }

    /// The identifier of the block type being built.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The cardinalities of the declared traits, validating the declaration.
    pub(crate) fn cardinalities(&self) -> Result<ValueIndices, BlockError> {
        if self.traits.len() > MAX_TRAITS {
            return Err(BlockError::construction(format!(
                "{} declares {} traits, at most {} are supported",
                self.identifier,
                self.traits.len(),
                MAX_TRAITS
            )));
        }

        let mut cardinalities = ValueIndices::new();
        for (i, trait_) in self.traits.iter().enumerate() {
            if self.traits[.. i]
                .iter()
                .any(|other| other.trait_name() == trait_.trait_name())
            {
                return Err(BlockError::DuplicateRegistration(format!(
                    "Trait {} of {}",
                    trait_.trait_name(),
                    self.identifier
                )));
            }

            let len = u16::try_from(trait_.cardinality())
                .ok()
                .filter(|&len| len > 0)
                .ok_or_else(|| {
                    BlockError::construction(format!(
                        "Trait {} of {} has an unsupported number of values",
                        trait_.trait_name(),
                        self.identifier
                    ))
                })?;
            cardinalities.push(len);
        }

        Ok(cardinalities)
    }

    /// Builds the full state space. `assign` is called once per state in stride order with the
    /// flat offset and the value index of each trait, and returns the runtime id and optional
    /// legacy meta of that state.
    pub(crate) fn build<F>(self, registry: RegistryId, mut assign: F) -> Result<Arc<BlockType>, BlockError>
    where F: FnMut(usize, &[u16]) -> Result<(StateId, Option<u8>), BlockError> {
        let cardinalities = self.cardinalities()?;
        let n = cardinalities.len();

        // factor[i] is the product of the cardinalities of every trait after i
        let mut factors = vec![1u32; n];
        let mut count = 1u32;
        for i in (0 .. n).rev() {
            factors[i] = count;
            count = count
                .checked_mul(cardinalities[i] as u32)
                .ok_or_else(|| {
                    BlockError::construction(format!("{} has too many states", self.identifier))
                })?;
        }

        let mut alternate_bases = vec![0u32; n];
        let mut alternate_stride = 0u32;
        for i in 0 .. n {
            alternate_bases[i] = alternate_stride;
            alternate_stride += cardinalities[i] as u32;
        }

        let mut states = Vec::with_capacity(count as usize);
        let mut alternates = Vec::with_capacity(count as usize * alternate_stride as usize);
        for offset in 0 .. count {
            let indices = (0 .. n)
                .map(|i| ((offset / factors[i]) % cardinalities[i] as u32) as u16)
                .collect::<ValueIndices>();

            for i in 0 .. n {
                let stripped = offset - factors[i] * indices[i] as u32;
                for j in 0 .. cardinalities[i] as u32 {
                    alternates.push(stripped + factors[i] * j);
                }
            }

            let (runtime_id, meta) = assign(offset as usize, &indices)?;
            let legacy = match (self.legacy_id, meta) {
                (Some(legacy_id), Some(meta)) => Some((legacy_id, meta)),
                _ => None,
            };

            states.push(StateData {
                runtime_id,
                legacy,
                indices,
            });
        }

        let default_offset = match self.default_offset {
            Some(offset) if offset < count as usize => offset as u32,
            Some(offset) => {
                return Err(BlockError::construction(format!(
                    "Default state {} of {} is out of bounds",
                    offset, self.identifier
                )))
            }
            None => self
                .traits
                .iter()
                .zip(factors.iter())
                .map(|(t, &factor)| factor * t.default_index() as u32)
                .sum(),
        };

        trace!(
            "Built {} with {} states over {} traits",
            self.identifier,
            count,
            n
        );

        Ok(Arc::new(BlockType {
            registry,
            identifier: self.identifier,
            legacy_id: self.legacy_id,
            traits: self.traits.into_boxed_slice(),
            factors: factors.into_boxed_slice(),
            alternate_bases: alternate_bases.into_boxed_slice(),
            alternate_stride,
            alternates: alternates.into_boxed_slice(),
            states: states.into_boxed_slice(),
            default_offset,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{
        traits::{BoolTrait, EnumTrait, IntTrait, Trait},
        values::{Axis, AXIS, WOOD_TYPE},
    };
    use proptest::prelude::*;

    fn build(builder: BlockTypeBuilder) -> Arc<BlockType> {
        let mut next = 100;
        builder
            .build(RegistryId::new(), |_, _| {
                next += 1;
                Ok((next - 1, None))
            })
            .unwrap()
    }

    #[test]
    fn traitless_type_has_one_state() {
        let stone = build(BlockTypeBuilder::new(Identifier::minecraft("stone")));

        assert_eq!(stone.state_count(), 1);
        assert_eq!(stone.default_state().runtime_id(), 100);
        assert_eq!(stone.states().count(), 1);
    }

    #[test]
    fn log_state_space() {
        let log = build(
            BlockTypeBuilder::new(Identifier::minecraft("log"))
                .with_trait(WOOD_TYPE.erase())
                .with_trait(AXIS.erase()),
        );

        assert_eq!(log.state_count(), 8 * 3);
        let default = log.default_state();
        assert_eq!(default.value(&*AXIS).unwrap(), Axis::Y);
        // wood_type is most significant, so the default is offset 1 (oak, y)
        assert_eq!(default.runtime_id(), 101);
        assert_eq!(log.factor(0), 3);
        assert_eq!(log.factor(1), 1);
    }

    #[test]
    fn duplicate_trait_names_rejected() {
        let result = BlockTypeBuilder::new(Identifier::minecraft("broken"))
            .with_trait(BoolTrait::new("open").erase())
            .with_trait(BoolTrait::with_default("open", true).erase())
            .build(RegistryId::new(), |offset, _| Ok((offset as StateId, None)));

        assert!(matches!(result, Err(BlockError::DuplicateRegistration(_))));
    }

    #[test]
    fn too_many_traits_rejected() {
        let builder = (0 .. MAX_TRAITS + 1).fold(
            BlockTypeBuilder::new(Identifier::minecraft("broken")),
            |builder, i| builder.with_trait(BoolTrait::new(&format!("t{}", i)).erase()),
        );

        assert!(matches!(
            builder.build(RegistryId::new(), |offset, _| Ok((offset as StateId, None))),
            Err(BlockError::Construction(_))
        ));
    }

    #[test]
    fn legacy_pairs_need_meta() {
        let ty = BlockTypeBuilder::new(Identifier::minecraft("planks"))
            .with_trait(WOOD_TYPE.erase())
            .legacy_id(5)
            .build(RegistryId::new(), |offset, _| {
                Ok((offset as StateId, if offset < 6 { Some(offset as u8) } else { None }))
            })
            .unwrap();

        assert_eq!(ty.state_at(2).unwrap().legacy(), Some((5, 2)));
        assert_eq!(ty.state_at(7).unwrap().legacy(), None);
    }

    #[test]
    fn properties_lookup() {
        let ty = build(
            BlockTypeBuilder::new(Identifier::minecraft("leaves"))
                .with_trait(IntTrait::new("distance", 1, 7).unwrap().erase())
                .with_trait(BoolTrait::new("persistent").erase()),
        );

        let state = ty
            .state_from_properties([("persistent", "true")])
            .unwrap();
        assert_eq!(state.value_index("distance").unwrap(), 0);
        assert_eq!(state.value_index("persistent").unwrap(), 1);

        assert!(ty.state_from_properties([("color", "red")]).is_err());
        assert!(ty.state_from_properties([("distance", "9")]).is_err());
    }

    proptest! {
        #[test]
        fn state_count_is_product(cardinalities in prop::collection::vec(1usize .. 6, 0 .. 5)) {
            let mut builder = BlockTypeBuilder::new(Identifier::minecraft("generated"));
            for (i, &len) in cardinalities.iter().enumerate() {
                let values = (0 .. len).map(|v| format!("v{}", v)).collect::<Vec<_>>();
                builder = builder.with_trait(EnumTrait::new(&format!("t{}", i), values).unwrap().erase());
            }
            let ty = build(builder);

            prop_assert_eq!(ty.state_count(), cardinalities.iter().product::<usize>());

            let default = ty.default_state();
            for i in 0 .. cardinalities.len() {
                prop_assert_eq!(default.value_index(&format!("t{}", i)).unwrap(), 0);
            }

            let mut seen = std::collections::HashSet::new();
            for state in ty.states() {
                prop_assert!(seen.insert(state.runtime_id()));
            }
        }
    }
}
