use indexmap::IndexMap;
use qblocks_util::Identifier;
use serde::{
    de::{self, MapAccess, Visitor},
    Deserialize,
    Deserializer,
    Serialize,
};
use std::{
    collections::HashMap,
    fmt::{self, Formatter},
};

/// The declarative description of one format version's block registry, usually read from
/// `<version>.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VersionDescription {
    /// The version this description applies to.
    pub version: String,
    /// Every block of the version, keyed by identifier.
    pub blocks: IndexMap<Identifier, BlockDescription>,
    /// How fluids are embedded in this version's states, if at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluids: Option<FluidDescription>,
}

/// The description of a single block type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockDescription {
    /// The legacy id of the block. Required.
    pub legacy_id: Option<u16>,
    /// The global block type this block converts to, defaulting to the same identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<Identifier>,
    /// Renames traits when converting to the global block type.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub global_traits: HashMap<String, String>,
    /// Trait names and their values, in stride order.
    #[serde(default)]
    pub properties: Properties,
    /// Every state of the block.
    pub states: Vec<StateDescription>,
}

/// The description of one state of a block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateDescription {
    /// The runtime id of the state.
    pub id: u32,
    /// The legacy meta of the state. Derived from the id when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<u8>,
    /// Whether this is the default state of its block.
    #[serde(default)]
    pub default: bool,
    /// The value of each trait.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Describes the fluid component embedded in a version's states.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FluidDescription {
    /// Blocks that are entirely fluid, such as water and lava.
    #[serde(default)]
    pub liquid_blocks: Vec<Identifier>,
    /// The boolean trait that marks a block as containing fluid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waterlogged_trait: Option<String>,
    /// The fluid contained by waterlogged blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waterlogged_fluid: Option<Identifier>,
}

/// An ordered map from trait name to its values. Deserialization rejects repeated trait names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Properties(pub IndexMap<String, Vec<String>>);

impl Properties {
    /// Iterates over the traits in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// The number of traits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether no traits are declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        deserializer.deserialize_map(PropertiesVisitor)
    }
}

struct PropertiesVisitor;

impl<'de> Visitor<'de> for PropertiesVisitor {
    type Value = Properties;

    fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "a map of trait names to lists of values")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where A: MapAccess<'de> {
        let mut properties = IndexMap::with_capacity(map.size_hint().unwrap_or(0));

        while let Some((name, values)) = map.next_entry::<String, Vec<String>>()? {
            if properties.contains_key(&name) {
                return Err(de::Error::custom(format!(
                    "trait {} is declared more than once",
                    name
                )));
            }
            properties.insert(name, values);
        }

        Ok(Properties(properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_keep_order() {
        let properties: Properties =
            serde_json::from_str(r#"{"z": ["1", "2"], "a": ["x"], "m": ["true", "false"]}"#).unwrap();

        assert_eq!(
            properties.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            vec!["z", "a", "m"]
        );
    }

    #[test]
    fn repeated_trait_names_rejected() {
        let result = serde_json::from_str::<Properties>(r#"{"axis": ["x"], "axis": ["y"]}"#);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("more than once"));
    }
}
