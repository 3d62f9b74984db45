use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};

/// The namespace assumed when an identifier is written without one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// An identifier is a two-part name composed of a namespace and a path separated by a colon, such
/// as `minecraft:stone`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    /// The namespace of this identifier.
    pub namespace: String,
    /// The path portion of this identifier.
    pub path: String,
}

impl Identifier {
    /// Returns an identifier with the given namespace and path.
    #[inline]
    pub fn new(namespace: &str, path: &str) -> Self {
        Identifier {
            namespace: namespace.to_owned(),
            path: path.to_owned(),
        }
    }

    /// Returns an identifier with namespace "minecraft" and the given path.
    ///
    /// # Examples
    ///
    /// ```
    /// # use qblocks_util::Identifier;
    /// let stone = Identifier::minecraft("stone");
    ///
    /// assert_eq!(stone.namespace, "minecraft");
    /// assert_eq!(stone.path, "stone");
    /// ```
    #[inline]
    pub fn minecraft(path: &str) -> Self {
        Self::new(DEFAULT_NAMESPACE, path)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierParseError;

    /// Parses the given string into an identifier.
    ///
    /// If the string is not in the form `namespace:path` then it is assumed that just a path was
    /// provided, and the namespace "minecraft" is used instead. This function will return an
    /// error if the string is empty or has an empty namespace or path.
    ///
    /// # Examples
    ///
    /// ```
    /// # use qblocks_util::Identifier;
    /// # use std::str::FromStr;
    /// let stone = Identifier::from_str("minecraft:stone").unwrap();
    /// assert_eq!(stone.namespace, "minecraft");
    /// assert_eq!(stone.path, "stone");
    ///
    /// let dirt = Identifier::from_str("dirt").unwrap();
    /// assert_eq!(dirt.namespace, "minecraft");
    ///
    /// let foobar = Identifier::from_str("foo:bar").unwrap();
    /// assert_eq!(foobar.namespace, "foo");
    /// assert_eq!(foobar.path, "bar");
    ///
    /// assert!(Identifier::from_str(":P").is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdentifierParseError(s.to_owned()));
        }

        let index = match s.find(':') {
            Some(index) => index,
            None => return Ok(Self::minecraft(s)),
        };

        if index == 0 || index == s.len() - 1 {
            Err(IdentifierParseError(s.to_owned()))
        } else {
            Ok(Self::new(&s[.. index], &s[index + 1 ..]))
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl Debug for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        let raw = String::deserialize(deserializer)?;
        Identifier::from_str(&raw).map_err(de::Error::custom)
    }
}

/// Returned when a string is not a valid identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifierParseError(pub String);

impl Display for IdentifierParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Expected two non-empty strings separated by a colon, found \"{}\"",
            self.0
        )
    }
}

impl Error for IdentifierParseError {}
