use super::{description::VersionDescription, GlobalBlockRegistry, VersionBlockRegistry};
use crate::{config::Config, BlockError};
use dashmap::DashMap;
use log::info;
use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::PathBuf,
    sync::Arc,
};

/// Builds version registries on first use and caches them for the lifetime of the process.
///
/// A registry is built from a description registered with
/// [`insert_description`](VersionRegistries::insert_description), or else from
/// `<directory>/<version>.json`. Aliases redirect a version to the description it shares with
/// another.
pub struct VersionRegistries {
    global: Arc<GlobalBlockRegistry>,
    directory: Option<PathBuf>,
    aliases: HashMap<String, String>,
    descriptions: DashMap<String, Arc<VersionDescription>>,
    registries: DashMap<String, Arc<OnceCell<Arc<VersionBlockRegistry>>>>,
}

impl VersionRegistries {
    /// Creates an empty cache reading descriptions from the given directory, if any.
    pub fn new(global: Arc<GlobalBlockRegistry>, directory: Option<PathBuf>) -> Self {
        VersionRegistries {
            global,
            directory,
            aliases: HashMap::new(),
            descriptions: DashMap::new(),
            registries: DashMap::new(),
        }
    }

    /// Creates a cache using the configured description directory and aliases.
    pub fn from_config(global: Arc<GlobalBlockRegistry>, config: &Config) -> Self {
        let mut registries = Self::new(global, Some(config.registry_dir.clone()));
        for (version, target) in &config.version_aliases {
            registries.alias(version, target);
        }
        registries
    }

    /// The global registry every cached registry converts to.
    pub fn global(&self) -> &Arc<GlobalBlockRegistry> {
        &self.global
    }

    /// Makes `version` share the registry of `target`.
    pub fn alias(&mut self, version: &str, target: &str) {
        self.aliases.insert(version.to_owned(), target.to_owned());
    }

    /// Registers an in-memory description, which takes precedence over description files.
    /// Versions that were already built keep their registry.
    pub fn insert_description(&self, description: VersionDescription) {
        self.descriptions
            .insert(description.version.clone(), Arc::new(description));
    }

    /// Follows the alias table to the version whose description is used for `version`.
    pub fn resolve<'a>(&'a self, version: &'a str) -> Result<&'a str, BlockError> {
        let mut current = version;
        for _ in 0 ..= self.aliases.len() {
            match self.aliases.get(current) {
                Some(target) => current = target.as_str(),
                None => return Ok(current),
            }
        }

        Err(BlockError::invalid(format!(
            "Version aliases of {} form a cycle",
            version
        )))
    }

    /// Returns the registry of the given version, building it if this is the first request.
    /// Concurrent first requests build the registry once.
    pub fn get(&self, version: &str) -> Result<Arc<VersionBlockRegistry>, BlockError> {
        let version = self.resolve(version)?;

        // Clone the cell out so the map shard is not locked while the registry builds
        let cell = self
            .registries
            .entry(version.to_owned())
            .or_default()
            .clone();

        let registry = cell.get_or_try_init(|| self.load(version))?;
        Ok(registry.clone())
    }

    /// The versions whose registries have been built, in no particular order.
    pub fn loaded_versions(&self) -> Vec<String> {
        self.registries
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn load(&self, version: &str) -> Result<Arc<VersionBlockRegistry>, BlockError> {
        let description = self
            .descriptions
            .get(version)
            .map(|description| description.value().clone());

        let registry = match description {
            Some(description) => VersionBlockRegistry::from_description(&description, &self.global)?,
            None => {
                let directory = self.directory.as_ref().ok_or_else(|| {
                    BlockError::invalid(format!("No block registry description for version {}", version))
                })?;
                let path = directory.join(format!("{}.json", version));
                info!("Loading block registry description {}", path.display());

                let file = File::open(&path)?;
                VersionBlockRegistry::from_reader(BufReader::new(file), &self.global)?
            }
        };

        Ok(Arc::new(registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BlockRegistry;
    use std::{fs, thread};

    fn description(version: &str) -> VersionDescription {
        serde_json::from_str(&format!(
            r#"{{
                "version": "{}",
                "blocks": {{
                    "air": {{ "legacy_id": 0, "states": [{{ "id": 0, "default": true }}] }},
                    "stone": {{ "legacy_id": 1, "states": [{{ "id": 16, "default": true }}] }}
                }}
            }}"#,
            version
        ))
        .unwrap()
    }

    #[test]
    fn builds_once_per_version() {
        let mut registries = VersionRegistries::new(GlobalBlockRegistry::new(), None);
        registries.alias("1.8.9", "1.12.2");
        registries.alias("1.12", "1.8.9");
        registries.insert_description(description("1.12.2"));
        let registries = Arc::new(registries);

        let handles = (0 .. 4)
            .map(|i| {
                let registries = registries.clone();
                thread::spawn(move || {
                    registries
                        .get(if i % 2 == 0 { "1.12" } else { "1.12.2" })
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();
        let built = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>();

        for registry in &built {
            assert!(Arc::ptr_eq(registry, &built[0]));
        }
        assert_eq!(built[0].version(), "1.12.2");
        assert_eq!(registries.loaded_versions(), vec!["1.12.2".to_owned()]);
    }

    #[test]
    fn missing_versions_fail() {
        let registries = VersionRegistries::new(GlobalBlockRegistry::new(), None);

        assert!(registries.get("1.7.10").unwrap_err().is_invalid_value());
        assert!(registries.loaded_versions().is_empty());
    }

    #[test]
    fn alias_cycles_fail() {
        let mut registries = VersionRegistries::new(GlobalBlockRegistry::new(), None);
        registries.alias("a", "b");
        registries.alias("b", "a");

        assert!(registries.resolve("a").is_err());
        assert_eq!(registries.resolve("c").unwrap(), "c");
    }

    #[test]
    fn reads_description_files() {
        let directory = std::env::temp_dir().join(format!("qblocks-registries-{}", std::process::id()));
        fs::create_dir_all(&directory).unwrap();
        fs::write(
            directory.join("1.10.json"),
            serde_json::to_string(&description("1.10")).unwrap(),
        )
        .unwrap();

        let registries = VersionRegistries::new(GlobalBlockRegistry::new(), Some(directory.clone()));
        let registry = registries.get("1.10").unwrap();
        assert_eq!(registry.state_for_legacy(1, 0).unwrap().runtime_id(), 16);
        assert!(matches!(registries.get("1.11"), Err(BlockError::Io(_))));

        fs::remove_dir_all(&directory).unwrap();
    }
}
