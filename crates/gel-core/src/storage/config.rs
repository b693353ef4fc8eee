use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::kernel::error::Result;
use crate::storage::error::StorageSystemError;
use crate::storage::StorageProvider;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// In-memory representation of configuration data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    #[serde(flatten)]
    values: HashMap<String, serde_json::Value>,
}

impl ConfigData {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a configuration value, `None` when absent or of another type
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value).map_err(|e| StorageSystemError::SerializationError {
            format: "json".to_string(),
            source: Box::new(e),
        })?;
        self.values.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Remove a configuration value
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    /// Check if key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Get all keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> Result<String> {
        let serialized = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(&self).map_err(boxed),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(&self).map_err(boxed),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(&self).map_err(boxed),
        };
        serialized.map_err(|source| {
            StorageSystemError::SerializationError {
                format: format.extension().to_string(),
                source,
            }
            .into()
        })
    }

    /// Deserialize from string based on format
    pub fn deserialize(data: &str, format: ConfigFormat) -> Result<Self> {
        let parsed = match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(boxed),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(boxed),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(boxed),
        };
        parsed.map_err(|source| {
            StorageSystemError::DeserializationError {
                format: format.extension().to_string(),
                source,
            }
            .into()
        })
    }
}

fn boxed<E: std::error::Error + Send + Sync + 'static>(e: E) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(e)
}

/// Loads, saves and caches named configuration files below one directory
#[derive(Debug)]
pub struct ConfigManager {
    /// Storage provider for reading/writing configs
    provider: Arc<dyn StorageProvider>,
    /// Default format for new configurations
    default_format: ConfigFormat,
    /// In-memory cache of loaded configurations
    cache: Mutex<HashMap<String, ConfigData>>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new(provider: Arc<dyn StorageProvider>, default_format: ConfigFormat) -> Self {
        Self {
            provider,
            default_format,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Get the default format
    pub fn default_format(&self) -> ConfigFormat {
        self.default_format
    }

    /// Path of configuration `name`, relative to the provider root
    pub fn resolve_config_path(&self, name: &str) -> PathBuf {
        if Path::new(name).extension().is_some() {
            PathBuf::from(name)
        } else {
            PathBuf::from(format!("{}.{}", name, self.default_format.extension()))
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, ConfigData>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load configuration from disk; a missing file is an empty configuration
    pub fn load_config(&self, name: &str) -> Result<ConfigData> {
        if let Some(config) = self.cache().get(name) {
            return Ok(config.clone());
        }

        let path = self.resolve_config_path(name);
        let config = if self.provider.exists(&path) {
            let format = ConfigFormat::from_path(&path)
                .ok_or_else(|| StorageSystemError::UnsupportedConfigFormat(path.display().to_string()))?;
            let content = self.provider.read_to_string(&path)?;
            ConfigData::deserialize(&content, format)?
        } else {
            ConfigData::new()
        };

        self.cache().insert(name.to_string(), config.clone());
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save_config(&self, name: &str, config: &ConfigData) -> Result<()> {
        let path = self.resolve_config_path(name);
        let format = ConfigFormat::from_path(&path).unwrap_or(self.default_format);
        let content = config.serialize(format)?;
        self.provider.write_string(&path, &content)?;

        self.cache().insert(name.to_string(), config.clone());
        Ok(())
    }

    /// Invalidate the cache for a specific configuration
    pub fn invalidate_cache(&self, name: &str) {
        self.cache().remove(name);
    }

    /// File already stored for `name` under any supported extension.
    /// With several candidates the first in file name order wins.
    pub fn find_stored(&self, name: &str) -> Result<Option<PathBuf>> {
        let root = Path::new("");
        if !self.provider.is_dir(root) {
            return Ok(None);
        }

        let found = self
            .provider
            .read_dir(root)?
            .into_iter()
            .filter(|path| self.provider.is_file(path))
            .filter(|path| path.file_stem().and_then(|stem| stem.to_str()) == Some(name))
            .find(|path| ConfigFormat::from_path(path).is_some());
        Ok(found)
    }
}
