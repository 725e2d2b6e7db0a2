//! Kernel module system for the supervisor
//!
//! Decides which kernel modules are loaded or unloaded, and in what order, at
//! system start/stop and on request.
//!
//! ## Architecture
//!
//! - **Registry**: one descriptor per module imported from the config store
//! - **Dependency resolution**: depth-first walk producing install/remove sequences
//! - **Use counts**: shared dependencies stay loaded until every requirer releases them
//! - **Lifecycle**: `Init -> Trying -> Installed | Removed`, one blocking loader
//!   command at a time

pub mod traits;
pub mod manager;
pub mod process;
pub mod registry;
pub mod loader;

pub use traits::{LaunchOutcome, LoadMode, LoadStatus, ModuleError, ProcessLauncher};
pub use manager::KernelModuleManager;
pub use loader::{CommandKind, ModuleCommand};
pub use process::{CommandLauncher, DryRunLauncher};
pub use registry::{
    ConfigImporter, DependencyResolver, ModuleDescriptor, ModuleLimits, ModuleRegistry,
    ResolvedSequence,
};
