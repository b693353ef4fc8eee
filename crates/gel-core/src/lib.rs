//! Plugin engine for the Eina music player.
//!
//! Plugins are discovered in the search paths (or linked into the host and
//! registered as builtins), loaded in dependency order, activated and torn
//! down again, and share live objects through a name-keyed registry. The
//! [`Application`] persists which plugins the user enabled.
pub mod kernel;
pub mod plugin_system;
pub mod storage;

pub use kernel::error::Error as KernelError;
pub use kernel::Application;
pub use plugin_system::{
    DependencyRollback, EngineConfig, Plugin, PluginDescriptor, PluginEngine, PluginEvent, PluginInstance,
    PluginSystemError, SharedHandle, SharedRegistry,
};
pub use storage::{Settings, StorageProvider};
