//! Builtin plugin that sets up logging for the whole application.
//!
//! Installs a `tracing` subscriber filtered by the `EINA_LOG` environment
//! variable and bridges the `log` records emitted by the engine into it.
use gel_core::kernel::constants::LOG_ENV;
use gel_core::plugin_system::{Plugin, PluginDescriptor, PluginEngine, PluginSystemError};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const PLUGIN_NAME: &str = "logging";

/// Filter used when `EINA_LOG` is unset or unparsable
const DEFAULT_FILTER: &str = "info";

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(PLUGIN_NAME, env!("CARGO_PKG_VERSION"))
        .with_short_description("Application logging")
        .with_long_description("Writes log output to stderr. Set EINA_LOG to change the filter, e.g. EINA_LOG=debug.")
        .with_author("Eina Project Contributors")
        .with_url("https://eina.example.org")
        .with_api("^0.1")
        .hidden(true)
}

pub fn create() -> Box<dyn Plugin> {
    Box::new(LoggingPlugin)
}

#[derive(Debug, Default)]
pub struct LoggingPlugin;

/// Builds the filter from `EINA_LOG`, falling back to [`DEFAULT_FILTER`]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_subscriber() -> Result<(), String> {
    tracing_log::LogTracer::init().map_err(|e| format!("Failed to bridge log records: {}", e))?;
    let subscriber = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set global subscriber: {}", e))
}

impl Plugin for LoggingPlugin {
    fn activate(&self, _engine: &mut PluginEngine) -> Result<(), PluginSystemError> {
        match init_subscriber() {
            Ok(()) => tracing::info!("Logging initialized"),
            // A second activation in the same process keeps the first subscriber
            Err(e) => tracing::debug!("{}", e),
        }
        Ok(())
    }

    fn deactivate(&self, _engine: &mut PluginEngine) -> Result<(), PluginSystemError> {
        tracing::debug!("Logging plugin deactivated");
        Ok(())
    }
}

gel_core::declare_plugin!(logging_plugin, descriptor, create);
