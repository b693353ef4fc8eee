//! The application settings store.
//!
//! [`Settings`] is one named configuration file read and written through a
//! [`ConfigManager`]. It is shared between the host and plugins (the
//! `settings` plugin publishes it in the shared registry), so every
//! read-modify-write cycle happens under a lock.
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::kernel::constants;
use crate::kernel::error::Result;
use crate::storage::config::{ConfigFormat, ConfigManager};
use crate::storage::local::LocalStorageProvider;
use crate::storage::provider::StorageProvider;

#[derive(Debug)]
pub struct Settings {
    manager: ConfigManager,
    name: String,
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl Settings {
    /// Settings stored in `<config_dir>`: an existing `settings.{json,toml,yaml,yml}`
    /// keeps its file and format, new settings are written as `settings.json`
    pub fn open(config_dir: PathBuf) -> Self {
        let provider: Arc<dyn StorageProvider> = Arc::new(LocalStorageProvider::new(config_dir.clone()));
        let manager = ConfigManager::new(provider, ConfigFormat::Json);
        let name = match manager.find_stored(constants::SETTINGS_NAME) {
            Ok(Some(file)) => file.to_string_lossy().into_owned(),
            Ok(None) => constants::SETTINGS_NAME.to_string(),
            Err(e) => {
                log::warn!("Cannot inspect {}: {}", config_dir.display(), e);
                constants::SETTINGS_NAME.to_string()
            }
        };
        log::debug!("Settings file: {}", config_dir.join(manager.resolve_config_path(&name)).display());
        Self::with_manager(manager, name, config_dir)
    }

    pub fn with_manager(manager: ConfigManager, name: impl Into<String>, root: PathBuf) -> Self {
        Self {
            manager,
            name: name.into(),
            root,
            write_lock: Mutex::new(()),
        }
    }

    /// Absolute path of the backing file
    pub fn path(&self) -> PathBuf {
        self.root.join(self.manager.resolve_config_path(&self.name))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        Ok(self.manager.load_config(&self.name)?.get(key))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut config = self.manager.load_config(&self.name)?;
        config.set(key, value)?;
        self.manager.save_config(&self.name, &config)
    }

    /// Returns whether the key was present
    pub fn remove(&self, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut config = self.manager.load_config(&self.name)?;
        if config.remove(key).is_none() {
            return Ok(false);
        }
        self.manager.save_config(&self.name, &config)?;
        Ok(true)
    }

    /// Drop cached values so the next read goes to disk
    pub fn reload(&self) {
        self.manager.invalidate_cache(&self.name);
    }
}
