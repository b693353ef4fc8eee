//! # Gel Core Plugin System Errors
//!
//! [`PluginSystemError`] is returned by every engine operation. Each variant
//! names the plugin involved so batch operations can log `plugin: message`
//! and carry on with the next plugin.
use std::path::PathBuf;
use crate::plugin_system::dependency::DependencyError;
use crate::plugin_system::version::VersionError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin '{name}' is already loaded from a different location{}", path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
    AlreadyLoaded {
        name: String,
        path: Option<PathBuf>,
    },

    #[error("Plugin '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("No plugin information for '{name}': {reason}")]
    InfoNotFound {
        name: String,
        reason: String,
    },

    #[error("Invalid plugin descriptor at '{path}': {message}")]
    InvalidDescriptor {
        path: PathBuf,
        message: String,
    },

    #[error("Plugin '{plugin}' needs '{dependency}': {source}")]
    MissingDependency {
        plugin: String,
        dependency: String,
        #[source]
        source: Box<PluginSystemError>,
    },

    #[error("Module for plugin '{name}' at '{path}' cannot be loaded: {message}")]
    ModuleNotLoadable {
        name: String,
        path: PathBuf,
        message: String,
    },

    #[error("Symbol '{symbol}' not found in '{path}': {message}")]
    SymbolNotFound {
        name: String,
        symbol: String,
        path: PathBuf,
        message: String,
    },

    #[error("Plugin '{name}' was built for plugin ABI {found}, the engine provides {expected}")]
    AbiMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Plugin '{name}' requires engine API '{required}', the engine provides {api}")]
    IncompatibleApi {
        name: String,
        required: String,
        api: String,
    },

    #[error("Plugin '{name}' could not be constructed: {message}")]
    InitFailed {
        name: String,
        message: String,
    },

    #[error("Plugin '{0}' is not loaded")]
    NotLoaded(String),

    #[error("Plugin '{0}' is already enabled")]
    AlreadyEnabled(String),

    #[error("Plugin '{0}' is not enabled")]
    NotEnabled(String),

    #[error("Dependency '{dependency}' of plugin '{plugin}' could not be activated: {source}")]
    DependencyNotActive {
        plugin: String,
        dependency: String,
        #[source]
        source: Box<PluginSystemError>,
    },

    #[error("Activation hook of plugin '{name}' failed: {message}")]
    InitHookFailed {
        name: String,
        message: String,
    },

    #[error("Deactivation hook of plugin '{name}' failed: {message}")]
    FiniHookFailed {
        name: String,
        message: String,
    },

    #[error("Plugin '{name}' has enabled dependents: {}", dependents.join(", "))]
    HasDependents {
        name: String,
        dependents: Vec<String>,
    },

    #[error("Plugin '{name}' is in use by: {}", dependents.join(", "))]
    InUse {
        name: String,
        dependents: Vec<String>,
    },

    #[error("Plugin '{name}' cannot be unloaded while its shared objects are still held: {}", keys.join(", "))]
    SharedObjectsHeld {
        name: String,
        keys: Vec<String>,
    },

    #[error("Plugin '{0}' must be disabled first")]
    NotDisabled(String),

    #[error("Plugin '{0}' is already in the middle of a lifecycle transition")]
    ReentrantTransition(String),

    #[error("Invalid plugin path '{path}': {reason}")]
    InvalidPath {
        path: PathBuf,
        reason: String,
    },

    #[error("Dependency resolution failed: {0}")]
    DependencyResolution(#[from] DependencyError),

    #[error("Version parsing error: {0}")]
    VersionParsing(#[from] VersionError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Purge left {} plugin(s) behind: {}", failures.len(), failures.iter().map(|(name, msg)| format!("{name}: {msg}")).collect::<Vec<_>>().join("; "))]
    PurgeIncomplete {
        failures: Vec<(String, String)>,
    },

    /// Failure reported by a plugin from inside one of its own hooks
    #[error("{0}")]
    Plugin(String),
}

impl PluginSystemError {
    /// Shorthand for hooks reporting their own failures
    pub fn plugin(message: impl Into<String>) -> Self {
        PluginSystemError::Plugin(message.into())
    }

    /// The plugin this error is about, when there is exactly one
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            PluginSystemError::AlreadyLoaded { name, .. }
            | PluginSystemError::InfoNotFound { name, .. }
            | PluginSystemError::ModuleNotLoadable { name, .. }
            | PluginSystemError::SymbolNotFound { name, .. }
            | PluginSystemError::AbiMismatch { name, .. }
            | PluginSystemError::IncompatibleApi { name, .. }
            | PluginSystemError::InitFailed { name, .. }
            | PluginSystemError::InitHookFailed { name, .. }
            | PluginSystemError::FiniHookFailed { name, .. }
            | PluginSystemError::HasDependents { name, .. }
            | PluginSystemError::InUse { name, .. }
            | PluginSystemError::SharedObjectsHeld { name, .. } => Some(name.as_str()),
            PluginSystemError::MissingDependency { plugin, .. }
            | PluginSystemError::DependencyNotActive { plugin, .. } => Some(plugin.as_str()),
            PluginSystemError::AlreadyRegistered(name)
            | PluginSystemError::NotLoaded(name)
            | PluginSystemError::AlreadyEnabled(name)
            | PluginSystemError::NotEnabled(name)
            | PluginSystemError::NotDisabled(name)
            | PluginSystemError::ReentrantTransition(name) => Some(name.as_str()),
            _ => None,
        }
    }
}
