#![cfg(test)]

//! Mock plugins recording their hook calls.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::plugin_system::engine::{EngineConfig, PluginEngine, PluginEvent};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::{Plugin, PluginDescriptor};

pub type Hook = Arc<dyn Fn(&mut PluginEngine) -> Result<(), PluginSystemError> + Send + Sync>;

/// Builds a hook from a closure
pub fn hook<F>(f: F) -> Option<Hook>
where
    F: Fn(&mut PluginEngine) -> Result<(), PluginSystemError> + Send + Sync + 'static,
{
    Some(Arc::new(f))
}

pub struct MockPlugin {
    name: String,
    calls: Arc<Mutex<Vec<String>>>,
    on_activate: Option<Hook>,
    on_deactivate: Option<Hook>,
}

impl MockPlugin {
    /// A plugin outside any harness, its calls recorded nowhere
    pub fn new(name: &str, on_activate: Option<Hook>, on_deactivate: Option<Hook>) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            on_activate,
            on_deactivate,
        }
    }
}

impl Plugin for MockPlugin {
    fn activate(&self, engine: &mut PluginEngine) -> Result<(), PluginSystemError> {
        self.calls.lock().unwrap().push(format!("activate:{}", self.name));
        match &self.on_activate {
            Some(hook) => hook(engine),
            None => Ok(()),
        }
    }

    fn deactivate(&self, engine: &mut PluginEngine) -> Result<(), PluginSystemError> {
        self.calls.lock().unwrap().push(format!("deactivate:{}", self.name));
        match &self.on_deactivate {
            Some(hook) => hook(engine),
            None => Ok(()),
        }
    }
}

/// An engine without search paths plus the records of its mock plugins
pub struct Harness {
    pub engine: PluginEngine,
    calls: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<PluginEvent>>>,
    constructed: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig {
            search_paths: Vec::new(),
            ..EngineConfig::default()
        })
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = PluginEngine::new(config);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        engine.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        Self {
            engine,
            calls: Arc::new(Mutex::new(Vec::new())),
            events,
            constructed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Registers a builtin mock plugin without hooks
    pub fn add(&mut self, name: &str, depends: &str) {
        self.add_with(PluginDescriptor::new(name, "1.0.0").with_dependencies(depends), None, None);
    }

    pub fn add_with(&mut self, descriptor: PluginDescriptor, on_activate: Option<Hook>, on_deactivate: Option<Hook>) {
        let name = descriptor.name().to_string();
        let calls = Arc::clone(&self.calls);
        let constructed = Arc::clone(&self.constructed);
        self.engine
            .register_builtin(descriptor, move || {
                constructed.fetch_add(1, Ordering::SeqCst);
                Box::new(MockPlugin {
                    name: name.clone(),
                    calls: Arc::clone(&calls),
                    on_activate: on_activate.clone(),
                    on_deactivate: on_deactivate.clone(),
                }) as Box<dyn Plugin>
            })
            .expect("register mock plugin");
    }

    /// Hook calls so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn events(&self) -> Vec<PluginEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Plugin objects built so far
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    /// The usual three plugins: `c` needs `a` and `b`, `b` needs `a`
    pub fn abc() -> Self {
        let mut harness = Self::new();
        harness.add("a", "");
        harness.add("b", "a");
        harness.add("c", "a,b");
        harness
    }
}

/// Names of the loaded plugins in load order
pub fn loaded_names(engine: &PluginEngine) -> Vec<String> {
    engine.plugins().iter().map(|p| p.name().to_string()).collect()
}
