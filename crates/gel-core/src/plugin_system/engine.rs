//! The plugin engine.
//!
//! [`PluginEngine`] owns the catalog of known plugins, the loaded instances,
//! the dependency graph between them and the shared object registry. It is
//! driven from a single thread through `&mut self`; plugin hooks receive the
//! same `&mut PluginEngine`, so they can call back into it.
//!
//! Lifecycle of a plugin:
//!
//! ```text
//! catalog --load--> loaded (disabled) --activate--> enabled
//!         <-unload-                   <-deactivate-
//! ```
//!
//! Loading pulls in dependencies first; activation enables disabled
//! dependencies first. Deactivation and unloading refuse while dependents
//! would be left behind.
use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;

use crate::plugin_system::dependency::{DependencyError, DependencyGraph};
use crate::plugin_system::descriptor::PluginDescriptor;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::instance::{ModuleHandle, PluginInstance};
use crate::plugin_system::loader::{self, panic_message};
use crate::plugin_system::shared::{SharedHandle, SharedRegistry, SharedValue};
use crate::plugin_system::traits::Plugin;
use crate::plugin_system::version::{api_version, parse_version, VersionRange};

/// What to do with dependencies loaded for a plugin whose own load failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DependencyRollback {
    /// Leave them loaded; a later load can reuse them
    #[default]
    Keep,
    /// Unload them again, most recently loaded first
    Unload,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// API version checked against descriptor requirements
    pub api_version: Version,
    pub rollback: DependencyRollback,
    /// Directories scanned for plugins, highest precedence first
    pub search_paths: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_version: api_version(),
            rollback: DependencyRollback::default(),
            search_paths: loader::default_search_paths(),
        }
    }
}

/// Lifecycle notifications, emitted after the transition completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEvent {
    Loaded(String),
    Activated(String),
    Deactivated(String),
    Unloaded(String),
}

type Listener = Box<dyn FnMut(&PluginEvent) + Send>;
type BuiltinFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

#[derive(Clone)]
enum PluginSource {
    Builtin(BuiltinFactory),
    Module,
}

#[derive(Clone)]
struct CatalogEntry {
    descriptor: PluginDescriptor,
    source: PluginSource,
}

pub struct PluginEngine {
    config: EngineConfig,
    catalog: BTreeMap<String, CatalogEntry>,
    plugins: HashMap<String, PluginInstance>,
    graph: DependencyGraph,
    shared: SharedRegistry,
    args: Vec<String>,
    listeners: Vec<Listener>,
    /// Plugins whose load is in progress, outermost first
    loading: Vec<String>,
    /// Plugins loaded during the current outermost load, in load order
    load_journal: Vec<String>,
    /// Plugins whose hooks are running, outermost first
    transitions: Vec<String>,
    next_serial: u64,
}

impl Default for PluginEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl PluginEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            catalog: BTreeMap::new(),
            plugins: HashMap::new(),
            graph: DependencyGraph::new(),
            shared: SharedRegistry::new(),
            args: Vec::new(),
            listeners: Vec::new(),
            loading: Vec::new(),
            load_journal: Vec::new(),
            transitions: Vec::new(),
            next_serial: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_rollback(&mut self, rollback: DependencyRollback) {
        self.config.rollback = rollback;
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.config.search_paths
    }

    /// Adds a directory in front of the existing search paths
    pub fn prepend_search_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        self.config.search_paths.retain(|p| p != &path);
        self.config.search_paths.insert(0, path);
    }

    /// Process arguments, available to plugins
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn set_args(&mut self, args: Vec<String>) {
        self.args = args;
    }

    /// Calls `listener` after every lifecycle transition
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&PluginEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: PluginEvent) {
        for listener in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    // --- Catalog ---

    /// Adds a plugin linked into the host. `factory` builds the plugin object
    /// on every load. The descriptor version must be semver.
    pub fn register_builtin<F>(&mut self, descriptor: PluginDescriptor, factory: F) -> Result<(), PluginSystemError>
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        let name = descriptor.name().to_string();
        parse_version(descriptor.version())?;
        if matches!(self.catalog.get(&name), Some(CatalogEntry { source: PluginSource::Builtin(_), .. })) {
            return Err(PluginSystemError::AlreadyRegistered(name));
        }
        log::debug!("Registered builtin plugin '{}'", name);
        self.catalog.insert(
            name,
            CatalogEntry {
                descriptor: descriptor.with_pathname(None),
                source: PluginSource::Builtin(Arc::new(factory)),
            },
        );
        Ok(())
    }

    /// Rescans the search paths and replaces the module part of the catalog.
    /// Builtin plugins stay and take precedence over modules of the same name.
    pub async fn scan(&mut self) -> Vec<PluginDescriptor> {
        let found = loader::scan(&self.config.search_paths).await;
        self.catalog.retain(|_, entry| matches!(entry.source, PluginSource::Builtin(_)));

        for descriptor in &found {
            if self.catalog.contains_key(descriptor.name()) {
                log::info!(
                    "Plugin module {} is shadowed by the builtin plugin '{}'",
                    descriptor.reference(),
                    descriptor.name()
                );
                continue;
            }
            self.catalog.insert(
                descriptor.name().to_string(),
                CatalogEntry {
                    descriptor: descriptor.clone(),
                    source: PluginSource::Module,
                },
            );
        }
        log::info!("Plugin catalog holds {} plugin(s)", self.catalog.len());
        found
    }

    /// Every known plugin, sorted by name
    pub fn catalog(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.catalog.values().map(|entry| &entry.descriptor)
    }

    pub fn descriptor(&self, name: &str) -> Option<&PluginDescriptor> {
        self.catalog.get(name).map(|entry| &entry.descriptor)
    }

    // --- Queries ---

    pub fn get(&self, name: &str) -> Option<&PluginInstance> {
        self.plugins.get(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.plugins.get(name).is_some_and(PluginInstance::is_enabled)
    }

    /// Loaded plugins, dependencies before dependents
    pub fn plugins(&self) -> Vec<&PluginInstance> {
        self.ordered_names().iter().filter_map(|name| self.plugins.get(name)).collect()
    }

    /// Loaded plugins that declared `name` as a dependency
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.graph.dependents_of(name)
    }

    /// References of the enabled, visible plugins in load order, as stored
    /// in the persisted selection
    pub fn enabled_references(&self) -> Vec<String> {
        self.plugins()
            .into_iter()
            .filter(|instance| instance.is_enabled() && !instance.descriptor().is_hidden())
            .map(|instance| instance.descriptor().reference())
            .collect()
    }

    fn ordered_names(&self) -> Vec<String> {
        self.graph.load_order().unwrap_or_else(|e| {
            log::error!("Plugin graph is inconsistent: {}", e);
            let mut names: Vec<String> = self.plugins.keys().cloned().collect();
            names.sort();
            names
        })
    }

    // --- Per-plugin data ---

    pub fn plugin_data<T: 'static>(&self, name: &str) -> Option<&T> {
        self.plugins.get(name).and_then(|instance| instance.data::<T>())
    }

    pub fn plugin_data_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.plugins.get_mut(name).and_then(|instance| instance.data_mut::<T>())
    }

    /// Stores opaque data for plugin `name`, replacing what was there
    pub fn set_plugin_data<T: Send + Sync + 'static>(&mut self, name: &str, data: T) -> Result<(), PluginSystemError> {
        let instance = self
            .plugins
            .get_mut(name)
            .ok_or_else(|| PluginSystemError::NotLoaded(name.to_string()))?;
        instance.set_data(Box::new(data));
        Ok(())
    }

    pub fn take_plugin_data<T: 'static>(&mut self, name: &str) -> Option<T> {
        let instance = self.plugins.get_mut(name)?;
        let data = instance.take_data()?;
        match data.downcast::<T>() {
            Ok(data) => Some(*data),
            Err(data) => {
                instance.set_data(data);
                None
            }
        }
    }

    // --- Shared registry ---

    /// Hook currently running, recorded as owner of what it publishes
    fn current_owner(&self) -> Option<String> {
        self.transitions.last().cloned()
    }

    /// Registers `value` under `key`; `false` when the key is taken
    pub fn shared_set(&mut self, key: &str, value: SharedValue) -> bool {
        let owner = self.current_owner();
        self.shared.set(key, value, owner.as_deref())
    }

    /// Registers `value` under `key` and hands back the handle that revokes it
    pub fn shared_publish<T: std::any::Any + Send + Sync>(&mut self, key: &str, value: Arc<T>) -> Option<SharedHandle> {
        let owner = self.current_owner();
        self.shared.publish(key, value, owner.as_deref())
    }

    pub fn shared_get(&self, key: &str) -> Option<SharedValue> {
        self.shared.get(key)
    }

    pub fn shared_get_as<T: std::any::Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.shared.get_as(key)
    }

    pub fn shared_unregister(&mut self, key: &str) -> Option<SharedValue> {
        self.shared.unregister(key)
    }

    pub fn shared_revoke(&mut self, handle: SharedHandle) -> Option<SharedValue> {
        self.shared.revoke(handle)
    }

    pub fn shared(&self) -> &SharedRegistry {
        &self.shared
    }

    // --- Loading ---

    /// Makes plugin `name` resident, loading its dependencies first.
    ///
    /// Loading an already loaded plugin returns the existing instance without
    /// looking at its dependencies again. Hooks are not run.
    pub fn load(&mut self, name: &str) -> Result<&PluginInstance, PluginSystemError> {
        self.load_inner(name)?;
        self.plugins
            .get(name)
            .ok_or_else(|| PluginSystemError::NotLoaded(name.to_string()))
    }

    fn load_inner(&mut self, name: &str) -> Result<(), PluginSystemError> {
        if self.plugins.contains_key(name) {
            return Ok(());
        }
        if self.loading.iter().any(|n| n == name) {
            let mut cycle = self.loading.clone();
            cycle.push(name.to_string());
            return Err(DependencyError::CyclicDependency(cycle).into());
        }

        let entry = self.catalog.get(name).cloned().ok_or_else(|| PluginSystemError::InfoNotFound {
            name: name.to_string(),
            reason: "not found in any plugin path".to_string(),
        })?;
        self.check_api(&entry.descriptor)?;

        let journal_mark = self.load_journal.len();
        self.loading.push(name.to_string());
        let result = self
            .load_dependencies(&entry.descriptor)
            .and_then(|()| self.open(&entry));
        self.loading.pop();

        let outcome = match result {
            Ok(instance) => self.insert_instance(instance),
            Err(e) => {
                self.rollback_to(journal_mark);
                Err(e)
            }
        };
        if self.loading.is_empty() {
            self.load_journal.clear();
        }
        outcome
    }

    fn load_dependencies(&mut self, descriptor: &PluginDescriptor) -> Result<(), PluginSystemError> {
        for dependency in descriptor.dependencies() {
            if self.plugins.contains_key(dependency) {
                continue;
            }
            log::debug!("Loading '{}' for '{}'", dependency, descriptor.name());
            match self.load_inner(dependency) {
                Ok(()) => {}
                Err(e @ PluginSystemError::DependencyResolution(DependencyError::CyclicDependency(_))) => return Err(e),
                Err(e) => {
                    return Err(PluginSystemError::MissingDependency {
                        plugin: descriptor.name().to_string(),
                        dependency: dependency.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_api(&self, descriptor: &PluginDescriptor) -> Result<(), PluginSystemError> {
        let Some(requirement) = descriptor.api_requirement() else {
            return Ok(());
        };
        let range = VersionRange::from_constraint(requirement)?;
        if range.includes(&self.config.api_version) {
            Ok(())
        } else {
            Err(PluginSystemError::IncompatibleApi {
                name: descriptor.name().to_string(),
                required: range.to_string(),
                api: self.config.api_version.to_string(),
            })
        }
    }

    /// Builds the plugin object, opening its module if it has one
    fn open(&mut self, entry: &CatalogEntry) -> Result<PluginInstance, PluginSystemError> {
        let descriptor = &entry.descriptor;
        let name = descriptor.name();
        let construct_failed = |payload| PluginSystemError::InitFailed {
            name: name.to_string(),
            message: format!("constructor panicked: {}", panic_message(payload)),
        };

        let (plugin, module) = match &entry.source {
            PluginSource::Builtin(factory) => {
                let plugin = panic::catch_unwind(AssertUnwindSafe(|| (**factory)())).map_err(construct_failed)?;
                (plugin, ModuleHandle::Builtin)
            }
            PluginSource::Module => {
                let path = descriptor.pathname().ok_or_else(|| PluginSystemError::InfoNotFound {
                    name: name.to_string(),
                    reason: "descriptor has no module path".to_string(),
                })?;
                let (library, declaration) = loader::open_module(name, path)?;
                let plugin = panic::catch_unwind(declaration.create).map_err(construct_failed)?;
                (
                    plugin,
                    ModuleHandle::Dynamic {
                        path: path.to_path_buf(),
                        library,
                    },
                )
            }
        };

        self.next_serial += 1;
        Ok(PluginInstance::new(descriptor.clone(), plugin, module, self.next_serial))
    }

    fn insert_instance(&mut self, instance: PluginInstance) -> Result<(), PluginSystemError> {
        let name = instance.name().to_string();
        self.graph.add_node(&name, instance.descriptor().dependencies())?;
        log::info!("Plugin '{}' loaded", name);
        self.plugins.insert(name.clone(), instance);
        self.load_journal.push(name.clone());
        self.emit(PluginEvent::Loaded(name));
        Ok(())
    }

    /// Installs `plugin` as loaded from `module`, skipping catalog and loader
    #[cfg(test)]
    pub(crate) fn insert_loaded(
        &mut self,
        descriptor: PluginDescriptor,
        plugin: Box<dyn Plugin>,
        module: ModuleHandle,
    ) -> Result<(), PluginSystemError> {
        self.catalog.insert(
            descriptor.name().to_string(),
            CatalogEntry {
                descriptor: descriptor.clone(),
                source: PluginSource::Module,
            },
        );
        self.next_serial += 1;
        let instance = PluginInstance::new(descriptor, plugin, module, self.next_serial);
        self.insert_instance(instance)?;
        self.load_journal.clear();
        Ok(())
    }

    fn rollback_to(&mut self, journal_mark: usize) {
        if self.config.rollback != DependencyRollback::Unload {
            return;
        }
        let pulled_in: Vec<String> = self.load_journal.drain(journal_mark..).collect();
        for name in pulled_in.iter().rev() {
            log::info!("Unloading '{}', loaded only for a failed load", name);
            if let Err(e) = self.unload(name) {
                log::warn!("{}: {}", name, e);
            }
        }
    }

    /// Loads the plugin whose module or descriptor file is at `path`.
    ///
    /// The path must lie below one of the search paths. Loading a plugin
    /// whose name is already taken by another location fails with
    /// [`PluginSystemError::AlreadyLoaded`].
    pub fn load_path(&mut self, path: &Path) -> Result<&PluginInstance, PluginSystemError> {
        if !loader::is_within_search_paths(path, &self.config.search_paths) {
            return Err(PluginSystemError::InvalidPath {
                path: path.to_path_buf(),
                reason: "not inside any plugin search path".to_string(),
            });
        }
        let plugin_dir = path.parent().ok_or_else(|| PluginSystemError::InvalidPath {
            path: path.to_path_buf(),
            reason: "no plugin directory".to_string(),
        })?;
        let descriptor = loader::read_plugin_dir(plugin_dir)?;
        let name = descriptor.name().to_string();

        let known = self.catalog.get(&name).map(|entry| {
            (
                entry.descriptor.pathname().map(Path::to_path_buf),
                matches!(entry.source, PluginSource::Builtin(_)),
            )
        });
        match known {
            Some((pathname, _)) if pathname.as_deref() == descriptor.pathname() => {}
            Some((pathname, _)) if self.plugins.contains_key(&name) => {
                return Err(PluginSystemError::AlreadyLoaded { name, path: pathname });
            }
            Some((_, true)) => {
                return Err(PluginSystemError::AlreadyRegistered(name));
            }
            _ => {
                self.catalog.insert(
                    name.clone(),
                    CatalogEntry {
                        descriptor,
                        source: PluginSource::Module,
                    },
                );
            }
        }
        self.load(&name)
    }

    /// Loads a persisted reference: a module path, or a plugin name
    pub fn load_reference(&mut self, reference: &str) -> Result<&PluginInstance, PluginSystemError> {
        let path = Path::new(reference);
        if path.is_absolute() {
            self.load_path(path)
        } else {
            self.load(reference)
        }
    }

    /// Loads every name in turn. Failures are logged and do not stop the batch.
    pub fn load_all<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<(String, Result<(), PluginSystemError>)> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let result = self.load(name).map(|_| ());
                if let Err(e) = &result {
                    log::error!("{}: {}", name, e);
                }
                (name.to_string(), result)
            })
            .collect()
    }

    // --- Activation ---

    fn begin_transition(&mut self, name: &str) -> Result<(), PluginSystemError> {
        if self.transitions.iter().any(|n| n == name) {
            return Err(PluginSystemError::ReentrantTransition(name.to_string()));
        }
        self.transitions.push(name.to_string());
        Ok(())
    }

    fn end_transition(&mut self) {
        self.transitions.pop();
    }

    /// Enables plugin `name`, enabling its disabled dependencies first.
    pub fn activate(&mut self, name: &str) -> Result<(), PluginSystemError> {
        let instance = self
            .plugins
            .get(name)
            .ok_or_else(|| PluginSystemError::NotLoaded(name.to_string()))?;
        if instance.is_enabled() {
            return Err(PluginSystemError::AlreadyEnabled(name.to_string()));
        }
        if self.transitions.iter().any(|n| n == name) {
            return Err(PluginSystemError::ReentrantTransition(name.to_string()));
        }
        let dependencies = instance.descriptor().dependencies().to_vec();

        for dependency in &dependencies {
            if !self.is_enabled(dependency) {
                self.activate(dependency).map_err(|e| PluginSystemError::DependencyNotActive {
                    plugin: name.to_string(),
                    dependency: dependency.clone(),
                    source: Box::new(e),
                })?;
            }
        }

        let plugin = self
            .plugins
            .get(name)
            .map(PluginInstance::plugin)
            .ok_or_else(|| PluginSystemError::NotLoaded(name.to_string()))?;

        self.begin_transition(name)?;
        // Dependencies stay pinned while the hook runs
        self.retain_dependencies(&dependencies);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| plugin.activate(self)));
        self.end_transition();

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(format!("panicked: {}", panic_message(payload))),
        };
        if let Some(message) = failure {
            self.release_dependencies(&dependencies);
            log::warn!("Plugin '{}' failed to activate: {}", name, message);
            return Err(PluginSystemError::InitHookFailed {
                name: name.to_string(),
                message,
            });
        }

        if let Some(instance) = self.plugins.get_mut(name) {
            instance.set_enabled(true);
        }
        log::info!("Plugin '{}' activated", name);
        self.emit(PluginEvent::Activated(name.to_string()));
        Ok(())
    }

    /// Disables plugin `name`. Fails without side effects while any enabled
    /// plugin depends on it.
    pub fn deactivate(&mut self, name: &str) -> Result<(), PluginSystemError> {
        let instance = self
            .plugins
            .get(name)
            .ok_or_else(|| PluginSystemError::NotLoaded(name.to_string()))?;
        if !instance.is_enabled() {
            return Err(PluginSystemError::NotEnabled(name.to_string()));
        }
        if self.transitions.iter().any(|n| n == name) {
            return Err(PluginSystemError::ReentrantTransition(name.to_string()));
        }

        // A dependent still activating holds a pin without being enabled yet
        let active_dependents: Vec<String> = self
            .graph
            .dependents_of(name)
            .into_iter()
            .filter(|dependent| self.is_enabled(dependent) || self.transitions.contains(dependent))
            .collect();
        if instance.in_use() > 0 || !active_dependents.is_empty() {
            return Err(PluginSystemError::HasDependents {
                name: name.to_string(),
                dependents: active_dependents,
            });
        }

        let dependencies = instance.descriptor().dependencies().to_vec();
        let plugin = instance.plugin();

        self.begin_transition(name)?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| plugin.deactivate(self)));
        self.end_transition();

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(format!("panicked: {}", panic_message(payload))),
        };
        if let Some(message) = failure {
            log::warn!("Plugin '{}' failed to deactivate: {}", name, message);
            return Err(PluginSystemError::FiniHookFailed {
                name: name.to_string(),
                message,
            });
        }

        self.release_dependencies(&dependencies);
        if let Some(instance) = self.plugins.get_mut(name) {
            instance.set_enabled(false);
        }
        log::info!("Plugin '{}' deactivated", name);
        self.emit(PluginEvent::Deactivated(name.to_string()));
        Ok(())
    }

    fn retain_dependencies(&mut self, dependencies: &[String]) {
        for dependency in dependencies {
            if let Some(instance) = self.plugins.get_mut(dependency) {
                instance.retain();
            }
        }
    }

    fn release_dependencies(&mut self, dependencies: &[String]) {
        for dependency in dependencies {
            if let Some(instance) = self.plugins.get_mut(dependency) {
                instance.release();
            }
        }
    }

    // --- Unloading ---

    /// Removes a disabled plugin nobody depends on and closes its module.
    ///
    /// Shared objects the plugin published and never revoked are removed first.
    /// A module stays open while anything else still holds a value it published.
    pub fn unload(&mut self, name: &str) -> Result<(), PluginSystemError> {
        let instance = self
            .plugins
            .get(name)
            .ok_or_else(|| PluginSystemError::NotLoaded(name.to_string()))?;
        if instance.is_enabled() {
            return Err(PluginSystemError::NotDisabled(name.to_string()));
        }
        if self.transitions.iter().any(|n| n == name) {
            return Err(PluginSystemError::ReentrantTransition(name.to_string()));
        }
        let dependents = self.graph.dependents_of(name);
        if !dependents.is_empty() {
            return Err(PluginSystemError::InUse {
                name: name.to_string(),
                dependents,
            });
        }

        if instance.is_dynamic() {
            let held = self.shared.held_elsewhere(name);
            if !held.is_empty() {
                return Err(PluginSystemError::SharedObjectsHeld {
                    name: name.to_string(),
                    keys: held,
                });
            }
        }

        for key in self.shared.keys_owned_by(name) {
            log::warn!("Plugin '{}' left shared object '{}' registered, removing it", name, key);
            self.shared.unregister(&key);
        }

        self.shared.forget_owner(name);
        self.graph.remove_node(name);
        // Closes the module last, after the plugin object is gone
        drop(self.plugins.remove(name));
        self.load_journal.retain(|n| n != name);
        log::info!("Plugin '{}' unloaded", name);
        self.emit(PluginEvent::Unloaded(name.to_string()));
        Ok(())
    }

    /// Tears everything down: deactivates every enabled plugin, dependents
    /// first, then unloads every plugin in the same order. Failures are
    /// logged and collected, the rest carries on.
    pub fn purge(&mut self) -> Result<(), PluginSystemError> {
        let order = self.ordered_names().into_iter().rev().collect::<Vec<_>>();
        let mut failures: Vec<(String, String)> = Vec::new();

        for name in &order {
            if self.is_enabled(name) {
                if let Err(e) = self.deactivate(name) {
                    log::error!("{}: {}", name, e);
                    failures.push((name.clone(), e.to_string()));
                }
            }
        }
        for name in &order {
            if self.is_loaded(name) && !self.is_enabled(name) {
                if let Err(e) = self.unload(name) {
                    log::error!("{}: {}", name, e);
                    failures.push((name.clone(), e.to_string()));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PluginSystemError::PurgeIncomplete { failures })
        }
    }
}
