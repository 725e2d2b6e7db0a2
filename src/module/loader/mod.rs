//! Module loading commands
//!
//! Builds the loader/unloader argument vectors for a module.

pub mod command;

pub use command::{CommandKind, ModuleCommand};
