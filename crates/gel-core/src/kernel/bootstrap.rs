use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::plugin_system::{EngineConfig, Plugin, PluginDescriptor, PluginEngine, PluginEvent, PluginSystemError};
use crate::storage::selection::{load_selection, save_selection};
use crate::storage::Settings;

/// Ties the plugin engine to the settings store.
///
/// Owns the [`PluginEngine`] and the [`Settings`] it persists the plugin
/// selection into. The selection is written when it changes through
/// [`enable`](Self::enable) / [`disable`](Self::disable), and once more at
/// shutdown if plugins were activated or deactivated behind its back.
pub struct Application {
    engine: PluginEngine,
    settings: Arc<Settings>,
    config_dir: PathBuf,
    selection_dirty: Arc<AtomicBool>,
    initialized: bool,
}

impl Application {
    /// Creates the application with its settings under `config_dir`.
    pub fn new(config_dir: PathBuf, config: EngineConfig) -> Result<Self> {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);
        std::fs::create_dir_all(&config_dir).map_err(|e| Error::io(e, "create_dir_all", config_dir.clone()))?;
        log::info!("Using config directory: {}", config_dir.display());

        let settings = Arc::new(Settings::open(config_dir.clone()));
        let mut engine = PluginEngine::new(config);

        let selection_dirty = Arc::new(AtomicBool::new(false));
        let dirty = Arc::clone(&selection_dirty);
        engine.subscribe(move |event| {
            if matches!(event, PluginEvent::Activated(_) | PluginEvent::Deactivated(_)) {
                dirty.store(true, Ordering::Relaxed);
            }
        });

        Ok(Application {
            engine,
            settings,
            config_dir,
            selection_dirty,
            initialized: false,
        })
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }

    pub fn engine(&self) -> &PluginEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PluginEngine {
        &mut self.engine
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Registers a plugin linked into the host
    pub fn register_builtin<F>(&mut self, descriptor: PluginDescriptor, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        Ok(self.engine.register_builtin(descriptor, factory)?)
    }

    /// Scans the plugin paths, brings up the `required` plugins and then the
    /// persisted selection.
    ///
    /// A required plugin that fails aborts startup. Plugins from the selection
    /// that fail are logged and skipped; they stay in the stored selection.
    pub async fn startup(&mut self, required: &[&str]) -> Result<()> {
        if self.initialized {
            return Err(Error::lifecycle(
                KernelLifecyclePhase::Startup,
                "Application already started",
                None,
            ));
        }

        self.engine.scan().await;

        for name in required {
            self.bring_up(name).map_err(|e| {
                Error::lifecycle(
                    KernelLifecyclePhase::Startup,
                    format!("Required plugin '{}' failed", name),
                    Some(e),
                )
            })?;
        }

        for reference in load_selection(&self.settings)? {
            if let Err(e) = self.bring_up(&reference) {
                log::error!("{}: {}", reference, e);
            }
        }

        // What startup activated is the stored selection already
        self.selection_dirty.store(false, Ordering::Relaxed);
        self.initialized = true;
        log::info!("Application started with {} plugin(s)", self.engine.plugins().len());
        Ok(())
    }

    /// Loads and activates `reference`, a plugin name or module path.
    /// Returns the plugin name.
    fn bring_up(&mut self, reference: &str) -> Result<String> {
        let name = self.engine.load_reference(reference)?.name().to_string();
        if !self.engine.is_enabled(&name) {
            self.engine.activate(&name)?;
        }
        Ok(name)
    }

    /// Enables `reference` and persists the selection. Returns the plugin name.
    pub fn enable(&mut self, reference: &str) -> Result<String> {
        let name = self.bring_up(reference)?;
        self.persist_selection()?;
        Ok(name)
    }

    /// Deactivates and unloads plugin `name`, then persists the selection.
    ///
    /// Refused up front, leaving the plugin running, while any loaded plugin
    /// depends on it.
    pub fn disable(&mut self, name: &str) -> Result<()> {
        let dependents = self.engine.dependents_of(name);
        if !dependents.is_empty() {
            return Err(PluginSystemError::InUse {
                name: name.to_string(),
                dependents,
            }
            .into());
        }
        if self.engine.is_enabled(name) {
            self.engine.deactivate(name)?;
        }
        self.engine.unload(name)?;
        self.persist_selection()
    }

    /// Writes the enabled, visible plugins to the settings
    pub fn persist_selection(&mut self) -> Result<()> {
        let references = self.engine.enabled_references();
        log::debug!("Persisting plugin selection: {:?}", references);
        save_selection(&self.settings, &references)?;
        self.selection_dirty.store(false, Ordering::Relaxed);
        Ok(())
    }

    /// Persists the selection if it changed, then tears every plugin down.
    pub fn shutdown(&mut self) -> Result<()> {
        log::info!("Shutting down plugins...");
        if self.selection_dirty.load(Ordering::Relaxed) {
            if let Err(e) = self.persist_selection() {
                log::error!("Failed to persist plugin selection: {}", e);
            }
        }

        // Purging deactivates everything; the selection must not see that
        self.engine.purge().map_err(|e| {
            Error::lifecycle(
                KernelLifecyclePhase::Shutdown,
                "Some plugins could not be torn down",
                Some(e.into()),
            )
        })?;
        self.selection_dirty.store(false, Ordering::Relaxed);
        self.initialized = false;
        log::info!("Shutdown complete.");
        Ok(())
    }
}
