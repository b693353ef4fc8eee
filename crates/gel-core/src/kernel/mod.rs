//! # Gel Core Kernel
//!
//! The `kernel` module holds what sits above the plugin engine: the
//! [`Application`](bootstrap::Application) that brings plugins up at startup
//! and persists the user's selection, the system-wide constants and the
//! top-level [`Error`](error::Error) type.
pub mod bootstrap;
pub mod constants;
pub mod error;

pub use bootstrap::Application;
pub use error::{Error, KernelLifecyclePhase, Result};
