use crate::BlockError;
use std::{
    any::Any,
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

/// A named axis of variation for a block, such as its orientation or whether it is open.
///
/// Every trait has a finite, ordered domain of values. Each value maps to a dense index in
/// `[0, len)` and can be encoded to and decoded from text.
pub trait Trait: Debug + Send + Sync + 'static {
    /// The type of value this trait takes.
    type Value: Clone + PartialEq + Debug;

    /// The name of this trait, unique within a block type.
    fn name(&self) -> &str;

    /// The number of values in this trait's domain.
    fn len(&self) -> usize;

    /// The value taken by a block type's default state.
    fn default_value(&self) -> Self::Value;

    /// Returns the index of the given value in this trait's domain.
    fn index_of(&self, value: &Self::Value) -> Result<usize, BlockError>;

    /// Returns the value at the given index, or `None` if the index is out of bounds.
    fn value_at(&self, index: usize) -> Option<Self::Value>;

    /// Converts a value of this trait to text.
    fn encode(&self, value: &Self::Value) -> String;

    /// Parses text produced by [`encode`](Trait::encode) back into a value of this trait.
    fn decode(&self, text: &str) -> Result<Self::Value, BlockError>;

    /// The kind of domain this trait has.
    fn kind(&self) -> TraitKind;

    /// Returns whether the given value belongs to this trait's domain.
    fn is_valid(&self, value: &Self::Value) -> bool {
        self.index_of(value).is_ok()
    }

    /// Wraps a copy of this trait for storage in a block type.
    fn erase(&self) -> TraitRef
    where Self: Clone + Sized {
        Arc::new(self.clone())
    }
}

/// A shared, type-erased trait as stored by block types.
pub type TraitRef = Arc<dyn AnyTrait>;

/// The kind of domain a trait has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraitKind {
    /// `false` and `true`.
    Bool,
    /// A contiguous integer range.
    Int {
        /// The smallest value.
        min: i32,
        /// The largest value.
        max: i32,
    },
    /// An explicit list of named values.
    Enum,
}

/// Object-safe access to a trait through value indices.
pub trait AnyTrait: Debug + Send + Sync + 'static {
    /// The name of this trait.
    fn trait_name(&self) -> &str;

    /// The number of values in this trait's domain.
    fn cardinality(&self) -> usize;

    /// The index of this trait's default value.
    fn default_index(&self) -> usize;

    /// Encodes the value at the given index, or returns `None` if the index is out of bounds.
    fn encode_index(&self, index: usize) -> Option<String>;

    /// Decodes text into a value index.
    fn decode_index(&self, text: &str) -> Result<usize, BlockError>;

    /// The kind of domain this trait has.
    fn trait_kind(&self) -> TraitKind;

    /// Allows downcasting to the concrete trait type.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Trait> AnyTrait for T {
    fn trait_name(&self) -> &str {
        self.name()
    }

    fn cardinality(&self) -> usize {
        self.len()
    }

    fn default_index(&self) -> usize {
        // Construction guarantees that the default value is valid
        self.index_of(&self.default_value()).unwrap_or(0)
    }

    fn encode_index(&self, index: usize) -> Option<String> {
        self.value_at(index).map(|value| self.encode(&value))
    }

    fn decode_index(&self, text: &str) -> Result<usize, BlockError> {
        let value = self.decode(text)?;
        self.index_of(&value)
    }

    fn trait_kind(&self) -> TraitKind {
        self.kind()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A trait whose domain is `{false, true}`, in that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoolTrait {
    name: String,
    default: bool,
}

impl BoolTrait {
    /// Creates a boolean trait that defaults to `false`.
    pub fn new(name: &str) -> Self {
        Self::with_default(name, false)
    }

    /// Creates a boolean trait with the given default.
    pub fn with_default(name: &str, default: bool) -> Self {
        BoolTrait {
            name: name.to_owned(),
            default,
        }
    }
}

impl Trait for BoolTrait {
    type Value = bool;

    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        2
    }

    fn default_value(&self) -> bool {
        self.default
    }

    fn index_of(&self, value: &bool) -> Result<usize, BlockError> {
        Ok(*value as usize)
    }

    fn value_at(&self, index: usize) -> Option<bool> {
        match index {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }

    fn encode(&self, value: &bool) -> String {
        value.to_string()
    }

    fn kind(&self) -> TraitKind {
        TraitKind::Bool
    }

    fn decode(&self, text: &str) -> Result<bool, BlockError> {
        if text.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if text.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(BlockError::invalid(format!(
                "\"{}\" is not a boolean value for trait {}",
                text, self.name
            )))
        }
    }
}

/// A trait whose domain is the contiguous integer range `[min, max]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntTrait {
    name: String,
    min: i32,
    max: i32,
    default: i32,
}

impl IntTrait {
    /// Creates an integer trait over `[min, max]` that defaults to `min`.
    pub fn new(name: &str, min: i32, max: i32) -> Result<Self, BlockError> {
        Self::with_default(name, min, max, min)
    }

    /// Creates an integer trait over `[min, max]` with the given default.
    ///
    /// Fails if `min >= max` or if the default is outside of the range.
    pub fn with_default(name: &str, min: i32, max: i32, default: i32) -> Result<Self, BlockError> {
        if min >= max {
            return Err(BlockError::construction(format!(
                "Integer trait {} needs min < max, got [{}, {}]",
                name, min, max
            )));
        }

        if default < min || default > max {
            return Err(BlockError::construction(format!(
                "Default value {} of integer trait {} is outside of [{}, {}]",
                default, name, min, max
            )));
        }

        Ok(IntTrait {
            name: name.to_owned(),
            min,
            max,
            default,
        })
    }

    // Callers must uphold min < max and min <= default <= max
    pub(crate) fn new_unchecked(name: &str, min: i32, max: i32, default: i32) -> Self {
        debug_assert!(min < max && default >= min && default <= max);
        IntTrait {
            name: name.to_owned(),
            min,
            max,
            default,
        }
    }

    /// The smallest value of this trait.
    pub fn min(&self) -> i32 {
        self.min
    }

    /// The largest value of this trait.
    pub fn max(&self) -> i32 {
        self.max
    }
}

impl Trait for IntTrait {
    type Value = i32;

    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        (self.max as i64 - self.min as i64 + 1) as usize
    }

    fn default_value(&self) -> i32 {
        self.default
    }

    fn index_of(&self, value: &i32) -> Result<usize, BlockError> {
        if *value < self.min || *value > self.max {
            Err(BlockError::invalid(format!(
                "{} is outside of [{}, {}] for trait {}",
                value, self.min, self.max, self.name
            )))
        } else {
            Ok((*value as i64 - self.min as i64) as usize)
        }
    }

    fn value_at(&self, index: usize) -> Option<i32> {
        if index < self.len() {
            Some((self.min as i64 + index as i64) as i32)
        } else {
            None
        }
    }

    fn encode(&self, value: &i32) -> String {
        value.to_string()
    }

    fn kind(&self) -> TraitKind {
        TraitKind::Int {
            min: self.min,
            max: self.max,
        }
    }

    fn decode(&self, text: &str) -> Result<i32, BlockError> {
        // Only the text encode produces is accepted: no plus sign, padding or leading zeros
        let value = text
            .parse::<i32>()
            .ok()
            .filter(|value| value.to_string() == text)
            .ok_or_else(|| {
                BlockError::invalid(format!(
                    "\"{}\" is not an integer value for trait {}",
                    text, self.name
                ))
            })?;

        self.index_of(&value)?;
        Ok(value)
    }
}

/// A value usable in an [`EnumTrait`].
pub trait TraitEnum: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// The text form of this value.
    fn name(&self) -> &str;
}

impl TraitEnum for String {
    fn name(&self) -> &str {
        self
    }
}

/// A trait whose domain is an explicit list of distinct values.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumTrait<E> {
    name: String,
    values: Vec<E>,
    default: usize,
}

impl<E: TraitEnum> EnumTrait<E> {
    /// Creates an enumeration trait that defaults to the first value.
    pub fn new(name: &str, values: Vec<E>) -> Result<Self, BlockError> {
        let default = values.first().cloned().ok_or_else(|| {
            BlockError::construction(format!("Enumeration trait {} has no values", name))
        })?;
        Self::with_default(name, values, default)
    }

    /// Creates an enumeration trait with the given default.
    ///
    /// Fails if `values` is empty, contains a value twice, or does not contain `default`.
    /// Values are compared by name without regard to case.
    pub fn with_default(name: &str, values: Vec<E>, default: E) -> Result<Self, BlockError> {
        if values.is_empty() {
            return Err(BlockError::construction(format!(
                "Enumeration trait {} has no values",
                name
            )));
        }

        for (i, value) in values.iter().enumerate() {
            if values[.. i]
                .iter()
                .any(|other| other == value || other.name().eq_ignore_ascii_case(value.name()))
            {
                return Err(BlockError::construction(format!(
                    "Enumeration trait {} contains {} twice",
                    name,
                    value.name()
                )));
            }
        }

        let default = values
            .iter()
            .position(|value| *value == default)
            .ok_or_else(|| {
                BlockError::construction(format!(
                    "Default value {} is not a value of enumeration trait {}",
                    default.name(),
                    name
                ))
            })?;

        Ok(EnumTrait {
            name: name.to_owned(),
            values,
            default,
        })
    }

    // Callers must provide distinct values and an in-bounds default
    pub(crate) fn new_unchecked(name: &str, values: &[E], default: usize) -> Self {
        debug_assert!(default < values.len());
        EnumTrait {
            name: name.to_owned(),
            values: values.to_vec(),
            default,
        }
    }

    /// The values of this trait in index order.
    pub fn values(&self) -> &[E] {
        &self.values
    }
}

impl<E: TraitEnum> Trait for EnumTrait<E> {
    type Value = E;

    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn default_value(&self) -> E {
        self.values[self.default].clone()
    }

    fn index_of(&self, value: &E) -> Result<usize, BlockError> {
        self.values
            .iter()
            .position(|v| v == value)
            .ok_or_else(|| {
                BlockError::invalid(format!(
                    "{} is not a value of trait {}",
                    value.name(),
                    self.name
                ))
            })
    }

    fn value_at(&self, index: usize) -> Option<E> {
        self.values.get(index).cloned()
    }

    fn encode(&self, value: &E) -> String {
        value.name().to_owned()
    }

    fn kind(&self) -> TraitKind {
        TraitKind::Enum
    }

    fn decode(&self, text: &str) -> Result<E, BlockError> {
        self.values
            .iter()
            .find(|value| value.name().eq_ignore_ascii_case(text))
            .cloned()
            .ok_or_else(|| {
                BlockError::invalid(format!(
                    "\"{}\" is not a value of trait {}",
                    text, self.name
                ))
            })
    }
}

impl Display for dyn AnyTrait {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.trait_name())?;
        for index in 0 .. self.cardinality() {
            if index > 0 {
                write!(f, ",")?;
            }
            if let Some(text) = self.encode_index(index) {
                write!(f, "{}", text)?;
            }
        }
        write!(f, "}}")
    }
}
