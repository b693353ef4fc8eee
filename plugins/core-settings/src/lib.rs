//! Builtin plugin that publishes the application [`Settings`] under the
//! `settings` key of the shared registry, for other plugins to read and
//! write their own keys.
use std::sync::{Arc, Mutex, PoisonError};

use gel_core::plugin_system::{Plugin, PluginDescriptor, PluginEngine, PluginSystemError, SharedHandle};
use gel_core::storage::Settings;

pub const PLUGIN_NAME: &str = "settings";

/// Shared registry key the settings store is published under
pub const SHARED_KEY: &str = "settings";

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(PLUGIN_NAME, env!("CARGO_PKG_VERSION"))
        .with_short_description("Settings store")
        .with_long_description("Gives plugins access to the application settings file.")
        .with_author("Eina Project Contributors")
        .with_url("https://eina.example.org")
        .with_api("^0.1")
        .hidden(true)
}

#[derive(Debug)]
pub struct SettingsPlugin {
    settings: Arc<Settings>,
    handle: Mutex<Option<SharedHandle>>,
}

impl SettingsPlugin {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            handle: Mutex::new(None),
        }
    }

    /// Factory for [`PluginEngine::register_builtin`]
    pub fn factory(settings: Arc<Settings>) -> impl Fn() -> Box<dyn Plugin> + Send + Sync + 'static {
        move || Box::new(SettingsPlugin::new(Arc::clone(&settings))) as Box<dyn Plugin>
    }
}

impl Plugin for SettingsPlugin {
    fn activate(&self, engine: &mut PluginEngine) -> Result<(), PluginSystemError> {
        let handle = engine
            .shared_publish(SHARED_KEY, Arc::clone(&self.settings))
            .ok_or_else(|| PluginSystemError::plugin(format!("shared key '{}' is already taken", SHARED_KEY)))?;
        log::debug!("Settings published from {}", self.settings.path().display());
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    fn deactivate(&self, engine: &mut PluginEngine) -> Result<(), PluginSystemError> {
        if let Some(handle) = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take() {
            engine.shared_revoke(handle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gel_core::plugin_system::EngineConfig;
    use tempfile::tempdir;

    fn engine_with_settings(settings: Arc<Settings>) -> PluginEngine {
        let mut engine = PluginEngine::new(EngineConfig {
            search_paths: Vec::new(),
            ..EngineConfig::default()
        });
        engine
            .register_builtin(descriptor(), SettingsPlugin::factory(settings))
            .expect("register");
        engine
    }

    #[test]
    fn test_publishes_settings_while_enabled() {
        let dir = tempdir().expect("tempdir");
        let settings = Arc::new(Settings::open(dir.path().to_path_buf()));
        settings.set("volume", 7).expect("set");

        let mut engine = engine_with_settings(Arc::clone(&settings));
        engine.load(PLUGIN_NAME).expect("load");
        engine.activate(PLUGIN_NAME).expect("activate");

        let shared = engine.shared_get_as::<Settings>(SHARED_KEY).expect("published");
        assert_eq!(shared.get::<i64>("volume").expect("get"), Some(7));
        assert_eq!(engine.shared().owner_of(SHARED_KEY), Some(PLUGIN_NAME));
        drop(shared);

        engine.deactivate(PLUGIN_NAME).expect("deactivate");
        assert!(!engine.shared().contains(SHARED_KEY));
    }

    #[test]
    fn test_activation_fails_when_key_taken() {
        let dir = tempdir().expect("tempdir");
        let settings = Arc::new(Settings::open(dir.path().to_path_buf()));
        let mut engine = engine_with_settings(settings);
        assert!(engine.shared_set(SHARED_KEY, Arc::new(0u8)));

        engine.load(PLUGIN_NAME).expect("load");
        let err = engine.activate(PLUGIN_NAME).expect_err("key is taken");
        assert!(matches!(err, PluginSystemError::InitHookFailed { .. }));
        assert!(!engine.is_enabled(PLUGIN_NAME));
    }

    #[test]
    fn test_writes_through_shared_settings_reach_disk() {
        let dir = tempdir().expect("tempdir");
        let settings = Arc::new(Settings::open(dir.path().to_path_buf()));
        let mut engine = engine_with_settings(Arc::clone(&settings));
        engine.load(PLUGIN_NAME).expect("load");
        engine.activate(PLUGIN_NAME).expect("activate");

        let shared = engine.shared_get_as::<Settings>(SHARED_KEY).expect("published");
        shared.set("theme", "dark").expect("set");

        let content = std::fs::read_to_string(settings.path()).expect("settings file");
        let value: serde_json::Value = serde_json::from_str(&content).expect("json");
        assert_eq!(value["theme"], "dark");
    }
}
