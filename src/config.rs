use log::*;
use qblocks_util::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display, Formatter},
    fs::{File, OpenOptions},
    io::{self, prelude::*, SeekFrom},
    path::{Path, PathBuf},
};

use crate::storage::DEFAULT_POOL_CAPACITY;

/// The library configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The directory holding version descriptions named `<version>.json`, defaults to
    /// `./registries`.
    pub registry_dir: PathBuf,
    /// Versions that share the description of another version, such as `"1.12.1": "1.12.2"`.
    pub version_aliases: HashMap<String, String>,
    /// The number of idle buffers each storage pool keeps, defaults to 64.
    pub pool_capacity: usize,
    /// Logging settings.
    pub log: LogConfig,
}

// Instantiate a config with default values
impl Default for Config {
    fn default() -> Self {
        Config {
            registry_dir: PathBuf::from("./registries"),
            version_aliases: HashMap::new(),
            pool_capacity: DEFAULT_POOL_CAPACITY,
            log: LogConfig::default(),
        }
    }
}

/// An error reading or writing the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or written.
    Io(io::Error),
    /// The default configuration could not be serialized.
    Json(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to access config file: {}", e),
            ConfigError::Json(e) => write!(f, "Failed to write config JSON: {}", e),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(x: io::Error) -> Self {
        ConfigError::Io(x)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(x: serde_json::Error) -> Self {
        ConfigError::Json(x)
    }
}

/// Attempts to parse the configuration at the given path. The config should be in JSON format.
///
/// A missing file is created with the default configuration, and a file holding invalid JSON
/// is overwritten with it.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        // Try to open the file
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        // Read the file to a string
        let mut json = String::new();
        file.read_to_string(&mut json)?;

        // Parse the json
        match serde_json::from_str(&json) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                error!("Invalid config JSON: {}", e);
                use_default(&mut file)
            }
        }
    } else {
        info!("Config file not found, creating file");
        use_default(&mut File::create(path)?)
    }
}

fn use_default(file: &mut File) -> Result<Config, ConfigError> {
    info!("Using default configurations");

    let default = Config::default();

    // Go to the beginning of the file
    file.seek(SeekFrom::Start(0))?;

    // Write the default JSON
    let json = serde_json::to_string_pretty(&default)?;
    let bytes = json.as_bytes();
    file.write_all(bytes)?;

    // Reset the file length
    file.set_len(bytes.len() as u64)?;

    Ok(default)
}
