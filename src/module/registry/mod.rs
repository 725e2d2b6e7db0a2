//! Module registry and import
//!
//! Handles the descriptor table, import from the config store, and dependency
//! resolution.

pub mod dependencies;
pub mod descriptor;
pub mod importer;
pub mod table;

pub use dependencies::{DependencyResolver, ResolvedSequence};
pub use descriptor::{format_parameter, ModuleDescriptor, ModuleLimits};
pub use importer::ConfigImporter;
pub use table::ModuleRegistry;
