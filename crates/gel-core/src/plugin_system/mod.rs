//! # Gel Plugin System
//!
//! Everything the application knows how to do beyond bootstrapping lives in
//! plugins. This module discovers them, loads them in dependency order, runs
//! their activation hooks and lets them share live objects with each other.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`descriptor`]**: Static plugin metadata ([`PluginDescriptor`]): name,
//!   version, dependencies, descriptive fields and where the module lives.
//! - **[`loader`]**: Search paths, module naming, opening dynamic modules
//!   through the [`declare_plugin!`](crate::declare_plugin) ABI and scanning
//!   directories for descriptors.
//! - **[`instance`]**: A loaded plugin ([`PluginInstance`]) and its module handle.
//! - **[`engine`]**: The orchestrator ([`PluginEngine`]) driving load,
//!   activate, deactivate, unload and purge.
//! - **[`shared`]**: The name-keyed [`SharedRegistry`] of live service objects.
//! - **[`dependency`]**: Dependency list parsing and the [`DependencyGraph`].
//! - **[`traits`]**: The [`Plugin`] trait every plugin implements.
//! - **[`version`]**: Engine API version and requirement matching.
//! - **[`error`]**: [`PluginSystemError`], returned by every engine operation.
pub mod dependency;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod instance;
pub mod loader;
pub mod shared;
pub mod traits;
pub mod version;

pub use dependency::DependencyGraph;
pub use descriptor::PluginDescriptor;
pub use engine::{DependencyRollback, EngineConfig, PluginEngine, PluginEvent};
pub use error::PluginSystemError;
pub use instance::{ModuleHandle, PluginInstance};
pub use loader::PluginDeclaration;
pub use shared::{SharedHandle, SharedRegistry, SharedValue};
pub use traits::Plugin;
pub use version::VersionRange;

#[cfg(test)]
mod tests;
