pub mod provider;
pub mod local;
pub mod config;
pub mod error;
pub mod settings;
pub mod selection;

/// Re-export key types
pub use provider::StorageProvider;
pub use local::LocalStorageProvider;
pub use config::{ConfigManager, ConfigFormat, ConfigData};
pub use settings::Settings;

#[cfg(test)]
mod tests;
