use crate::StateId;
use qblocks_util::{Identifier, IdentifierParseError};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io::Error as IoError,
};

/// Errors produced while building or querying block types, registries and storages.
#[derive(Debug)]
pub enum BlockError {
    /// A trait, block type, registry or version description is malformed.
    Construction(String),
    /// A caller-supplied value is outside of the accepted domain.
    InvalidValue(String),
    /// No block type with the given identifier is registered.
    UnknownIdentifier(Identifier),
    /// No block type with the given legacy id is registered.
    UnknownLegacyId(u16),
    /// No state has the given legacy id and meta.
    UnknownLegacyState {
        /// The legacy block id.
        legacy_id: u16,
        /// The legacy meta value.
        meta: u8,
    },
    /// No state has the given runtime id.
    UnknownRuntimeId(StateId),
    /// An identifier or trait name was registered twice.
    DuplicateRegistration(String),
    /// A palette cannot grow past the given bit width.
    CapacityExceeded {
        /// The width at which growth failed.
        bits: u32,
    },
    /// A version description could not be read.
    Io(IoError),
}

impl BlockError {
    /// Returns whether this error was caused by a value outside of its domain, including failed
    /// lookups.
    pub fn is_invalid_value(&self) -> bool {
        matches!(
            self,
            BlockError::InvalidValue(_)
                | BlockError::UnknownIdentifier(_)
                | BlockError::UnknownLegacyId(_)
                | BlockError::UnknownLegacyState { .. }
                | BlockError::UnknownRuntimeId(_)
        )
    }

    pub(crate) fn construction<T: Display>(msg: T) -> Self {
        BlockError::Construction(msg.to_string())
    }

    pub(crate) fn invalid<T: Display>(msg: T) -> Self {
        BlockError::InvalidValue(msg.to_string())
    }
}

impl Display for BlockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::Construction(msg) => write!(f, "Construction error: {}", msg),
            BlockError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            BlockError::UnknownIdentifier(identifier) =>
                write!(f, "Unknown block identifier {}", identifier),
            BlockError::UnknownLegacyId(id) => write!(f, "Unknown legacy block id {}", id),
            BlockError::UnknownLegacyState { legacy_id, meta } =>
                write!(f, "Unknown legacy block state {}:{}", legacy_id, meta),
            BlockError::UnknownRuntimeId(id) => write!(f, "Unknown runtime id {}", id),
            BlockError::DuplicateRegistration(name) =>
                write!(f, "{} is already registered", name),
            BlockError::CapacityExceeded { bits } =>
                write!(f, "Palette cannot grow past {} bits per block", bits),
            BlockError::Io(error) => Display::fmt(error, f),
        }
    }
}

impl Error for BlockError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BlockError::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl From<IoError> for BlockError {
    fn from(x: IoError) -> Self {
        BlockError::Io(x)
    }
}

impl From<IdentifierParseError> for BlockError {
    fn from(x: IdentifierParseError) -> Self {
        BlockError::InvalidValue(x.to_string())
    }
}

impl From<serde_json::Error> for BlockError {
    fn from(x: serde_json::Error) -> Self {
        BlockError::Construction(format!("Invalid version description: {}", x))
    }
}
