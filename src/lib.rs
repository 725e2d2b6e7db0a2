//! kmod-supervisor - kernel module lifecycle management for an embedded-Linux
//! process supervisor
//!
//! Loads and unloads the kernel modules declared in the supervisor's config store,
//! in dependency order, keeping shared dependencies alive through use counts.
//! Loading and unloading are delegated to the system's loader executables
//! (`insmod`/`rmmod` by default).
//!
//! ## Design Principles
//!
//! 1. **Explicit context**: all state lives in a [`KernelModuleManager`] owned by
//!    the supervisor
//! 2. **Ordered and counted**: dependencies load first and unload last
//! 3. **Fail fast**: a failed loader command stops its chain and is reported
//! 4. **Pluggable edges**: the config store and the process launcher are traits

pub mod config;
pub mod module;
pub mod utils;

// Re-export config module
pub use config::*;

pub use module::{
    CommandLauncher, DryRunLauncher, KernelModuleManager, LaunchOutcome, LoadMode, LoadStatus,
    ModuleCommand, ModuleDescriptor, ModuleError, ProcessLauncher,
};
