//! Example dynamic plugin.
//!
//! Reads its greeting from the shared settings store and publishes a
//! [`Greeter`] other plugins can use. Built as a `cdylib`, it is dropped into
//! `<search path>/hello/` next to `hello.toml`.
use std::sync::{Arc, Mutex, PoisonError};

use gel_core::plugin_system::{Plugin, PluginDescriptor, PluginEngine, PluginSystemError, SharedHandle};
use gel_core::storage::Settings;

pub const PLUGIN_NAME: &str = "hello";

/// Settings key holding the greeting
pub const GREETING_KEY: &str = "hello.greeting";
pub const DEFAULT_GREETING: &str = "Hello from Eina";

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(PLUGIN_NAME, env!("CARGO_PKG_VERSION"))
        .with_dependencies("settings")
        .with_short_description("Says hello")
        .with_long_description("Example plugin publishing a greeter built from the settings.")
        .with_author("Eina Project Contributors")
        .with_url("https://eina.example.org")
        .with_api("^0.1")
}

pub fn create() -> Box<dyn Plugin> {
    Box::new(HelloPlugin::default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeter {
    greeting: String,
}

impl Greeter {
    pub fn greet(&self, who: &str) -> String {
        format!("{}, {}!", self.greeting, who)
    }
}

#[derive(Debug, Default)]
pub struct HelloPlugin {
    handle: Mutex<Option<SharedHandle>>,
}

impl Plugin for HelloPlugin {
    fn activate(&self, engine: &mut PluginEngine) -> Result<(), PluginSystemError> {
        let settings = engine
            .shared_get_as::<Settings>("settings")
            .ok_or_else(|| PluginSystemError::plugin("settings service is not available"))?;
        let greeting = settings
            .get_or(GREETING_KEY, DEFAULT_GREETING.to_string())
            .map_err(|e| PluginSystemError::plugin(e.to_string()))?;

        let handle = engine
            .shared_publish(PLUGIN_NAME, Arc::new(Greeter { greeting }))
            .ok_or_else(|| PluginSystemError::plugin("a greeter is already published"))?;
        *self.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        log::info!("Hello plugin activated");
        Ok(())
    }

    fn deactivate(&self, engine: &mut PluginEngine) -> Result<(), PluginSystemError> {
        if let Some(handle) = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take() {
            engine.shared_revoke(handle);
        }
        log::info!("Hello plugin deactivated");
        Ok(())
    }
}

gel_core::declare_plugin!(hello_plugin, descriptor, create);
