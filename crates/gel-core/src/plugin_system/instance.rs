use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;

use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::traits::Plugin;

/// Where the code of a loaded plugin lives
pub enum ModuleHandle {
    /// Linked into the host
    Builtin,
    /// Opened from a shared library, closed when the instance is dropped
    Dynamic { path: PathBuf, library: Library },
}

impl ModuleHandle {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ModuleHandle::Builtin => None,
            ModuleHandle::Dynamic { path, .. } => Some(path),
        }
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleHandle::Builtin => write!(f, "Builtin"),
            ModuleHandle::Dynamic { path, .. } => f.debug_struct("Dynamic").field("path", path).finish(),
        }
    }
}

/// Runtime record of a loaded plugin.
///
/// Fields drop in declaration order: the plugin object and its data go
/// before the module that holds their code.
pub struct PluginInstance {
    plugin: Arc<dyn Plugin>,
    data: Option<Box<dyn Any + Send + Sync>>,
    descriptor: PluginDescriptor,
    enabled: bool,
    in_use: usize,
    serial: u64,
    module: ModuleHandle,
}

impl PluginInstance {
    pub(crate) fn new(descriptor: PluginDescriptor, plugin: Box<dyn Plugin>, module: ModuleHandle, serial: u64) -> Self {
        Self {
            plugin: Arc::from(plugin),
            data: None,
            descriptor,
            enabled: false,
            in_use: 0,
            serial,
            module,
        }
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of enabled plugins depending on this one, counting those whose
    /// activation hook is running
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Distinct for every load, so a reloaded plugin never compares equal
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn module(&self) -> &ModuleHandle {
        &self.module
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.module, ModuleHandle::Dynamic { .. })
    }

    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.as_deref().and_then(|data| data.downcast_ref::<T>())
    }

    pub fn data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.data.as_deref_mut().and_then(|data| data.downcast_mut::<T>())
    }

    pub(crate) fn set_data(&mut self, data: Box<dyn Any + Send + Sync>) -> Option<Box<dyn Any + Send + Sync>> {
        self.data.replace(data)
    }

    pub(crate) fn take_data(&mut self) -> Option<Box<dyn Any + Send + Sync>> {
        self.data.take()
    }

    pub(crate) fn plugin(&self) -> Arc<dyn Plugin> {
        Arc::clone(&self.plugin)
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn retain(&mut self) {
        self.in_use += 1;
    }

    pub(crate) fn release(&mut self) {
        self.in_use = self.in_use.saturating_sub(1);
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("name", &self.descriptor.name())
            .field("enabled", &self.enabled)
            .field("in_use", &self.in_use)
            .field("serial", &self.serial)
            .field("module", &self.module)
            .finish()
    }
}
