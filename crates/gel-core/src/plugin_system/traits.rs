use crate::plugin_system::engine::PluginEngine;
use crate::plugin_system::error::PluginSystemError;

/// Behaviour of a plugin. Its metadata lives in a
/// [`PluginDescriptor`](crate::plugin_system::descriptor::PluginDescriptor).
///
/// Both hooks receive the engine itself, so a plugin can publish or consume
/// shared objects and even load or activate other plugins while it is being
/// (de)activated. Panics inside a hook are caught and reported as a hook
/// failure.
pub trait Plugin: Send + Sync {
    /// Called when the plugin is enabled. Every dependency is already active.
    /// Returning an error leaves the plugin loaded but disabled.
    fn activate(&self, engine: &mut PluginEngine) -> Result<(), PluginSystemError>;

    /// Called when the plugin is disabled. Returning an error leaves the
    /// plugin enabled. Shared objects published in `activate` should be
    /// revoked here.
    fn deactivate(&self, engine: &mut PluginEngine) -> Result<(), PluginSystemError>;
}
