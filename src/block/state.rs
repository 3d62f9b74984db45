use super::{
    block_type::BlockType,
    traits::{AnyTrait, Trait},
};
use crate::{registry::RegistryId, BlockError, StateId};
use indexmap::IndexMap;
use qblocks_util::Identifier;
use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

/// One concrete point in a block type's state space.
///
/// A block state is a cheap handle onto the state table of its block type. Two handles are
/// equal exactly when they belong to the same registry and carry the same runtime id.
#[derive(Clone)]
pub struct BlockState {
    ty: Arc<BlockType>,
    offset: u32,
}

impl BlockState {
    #[inline]
    pub(crate) fn new(ty: Arc<BlockType>, offset: u32) -> Self {
        debug_assert!((offset as usize) < ty.state_count());
        BlockState { ty, offset }
    }

    /// The block type this state belongs to.
    #[inline]
    pub fn block_type(&self) -> &Arc<BlockType> {
        &self.ty
    }

    /// The identifier of this state's block type.
    #[inline]
    pub fn identifier(&self) -> &Identifier {
        self.ty.identifier()
    }

    /// The registry-scoped runtime id of this state.
    #[inline]
    pub fn runtime_id(&self) -> StateId {
        self.ty.state_data(self.offset).runtime_id
    }

    /// The legacy id and meta of this state, if it has them.
    #[inline]
    pub fn legacy(&self) -> Option<(u16, u8)> {
        self.ty.state_data(self.offset).legacy
    }

    /// The registry this state belongs to.
    #[inline]
    pub fn registry_id(&self) -> RegistryId {
        self.ty.registry_id()
    }

    /// The position of this state in its block type's stride order.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    /// Returns whether this is the default state of its block type.
    #[inline]
    pub fn is_default(&self) -> bool {
        self.offset == self.ty.default_offset()
    }

    /// Returns the value this state takes for the given trait.
    pub fn value<T: Trait>(&self, trait_: &T) -> Result<T::Value, BlockError> {
        let (position, stored) = self.typed_trait(trait_)?;
        let index = self.ty.state_data(self.offset).indices[position] as usize;
        stored.value_at(index).ok_or_else(|| {
            BlockError::invalid(format!("Corrupted value index {} in {}", index, self))
        })
    }

    /// Returns the value index this state takes for the trait with the given name.
    pub fn value_index(&self, name: &str) -> Result<usize, BlockError> {
        let position = self.position(name)?;
        Ok(self.ty.state_data(self.offset).indices[position] as usize)
    }

    /// Returns the state that is identical to this one except that the given trait takes the
    /// given value.
    pub fn with_trait<T: Trait>(&self, trait_: &T, value: T::Value) -> Result<BlockState, BlockError> {
        let (position, stored) = self.typed_trait(trait_)?;
        let index = stored.index_of(&value)?;
        Ok(self.with_position(position, index))
    }

    /// Returns the state that is identical to this one except that the named trait takes the
    /// value at the given index.
    pub fn with_trait_index(&self, name: &str, index: usize) -> Result<BlockState, BlockError> {
        let position = self.position(name)?;
        let len = self.ty.traits()[position].cardinality();
        if index >= len {
            return Err(BlockError::invalid(format!(
                "Value index {} is out of bounds for trait {} with {} values",
                index, name, len
            )));
        }

        Ok(self.with_position(position, index))
    }

    /// Returns the state that is identical to this one except that the named trait takes the
    /// value decoded from the given text.
    pub fn with_trait_str(&self, name: &str, text: &str) -> Result<BlockState, BlockError> {
        let position = self.position(name)?;
        let index = self.ty.traits()[position].decode_index(text)?;
        Ok(self.with_position(position, index))
    }

    /// The encoded value of every trait of this state, in declaration order.
    pub fn encoded_properties(&self) -> IndexMap<String, String> {
        let indices = &self.ty.state_data(self.offset).indices;
        self.ty
            .traits()
            .iter()
            .zip(indices.iter())
            .map(|(t, &index)| {
                (
                    t.trait_name().to_owned(),
                    t.encode_index(index as usize).unwrap_or_default(),
                )
            })
            .collect()
    }

    #[inline]
    fn with_position(&self, position: usize, index: usize) -> BlockState {
        BlockState::new(
            self.ty.clone(),
            self.ty.alternate(self.offset, position, index),
        )
    }

    fn position(&self, name: &str) -> Result<usize, BlockError> {
        self.ty.trait_position(name).ok_or_else(|| {
            BlockError::invalid(format!(
                "{} has no trait named {}",
                self.ty.identifier(),
                name
            ))
        })
    }

    // Finds the trait with the same name as the given one, and makes sure it is of the same type
    fn typed_trait<T: Trait>(&self, trait_: &T) -> Result<(usize, &T), BlockError> {
        let position = self.position(trait_.name())?;
        match self.ty.traits()[position].as_any().downcast_ref::<T>() {
            Some(stored) => Ok((position, stored)),
            None => Err(BlockError::invalid(format!(
                "Trait {} of {} is not of the requested type",
                trait_.name(),
                self.ty.identifier()
            ))),
        }
    }
}

impl PartialEq for BlockState {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.runtime_id() == other.runtime_id() && self.registry_id() == other.registry_id()
    }
}

impl Eq for BlockState {}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.registry_id().hash(state);
        self.runtime_id().hash(state);
    }
}

impl Display for BlockState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self.ty.identifier(), f)?;

        let properties = self.encoded_properties();
        if !properties.is_empty() {
            write!(
                f,
                "[{}]",
                properties
                    .iter()
                    .map(|(name, value)| format!("{}={}", name, value))
                    .collect::<Vec<String>>()
                    .join(",")
            )?;
        }

        Ok(())
    }
}

impl Debug for BlockState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self, self.runtime_id())
    }
}
