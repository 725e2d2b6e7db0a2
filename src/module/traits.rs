//! Kernel module system traits and interfaces
//!
//! Defines the module state machine, the error type shared by the manager and its
//! components, and the process launcher seam used to run loader commands.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::ConfigStoreError;
use crate::module::loader::ModuleCommand;

/// Module load status
///
/// `Init -> Trying -> Installed | Removed`. `Trying` is only held while a command
/// for the module is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadStatus {
    /// Imported, never loaded or unloaded
    Init,
    /// Load or unload command in progress
    Trying,
    /// Loader command succeeded
    Installed,
    /// Unloader command succeeded
    Removed,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadStatus::Init => "init",
            LoadStatus::Trying => "trying",
            LoadStatus::Installed => "installed",
            LoadStatus::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// When a module is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadMode {
    /// Loaded at system start, unloaded at system stop
    Automatic,
    /// Loaded and unloaded only on explicit request
    Manual,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Automatic => f.write_str("auto"),
            LoadMode::Manual => f.write_str("manual"),
        }
    }
}

/// Result of running one external command to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Exited normally with status 0
    Success,
    /// Exited normally with a nonzero status
    ExitCode(i32),
    /// Terminated by a signal
    Signaled(i32),
    /// Could not be started at all
    LaunchFailure(String),
}

impl LaunchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LaunchOutcome::Success)
    }
}

impl fmt::Display for LaunchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchOutcome::Success => f.write_str("exited successfully"),
            LaunchOutcome::ExitCode(code) => write!(f, "exited with error code {}", code),
            LaunchOutcome::Signaled(sig) => write!(f, "was killed by signal {}", sig),
            LaunchOutcome::LaunchFailure(reason) => write!(f, "could not be started: {}", reason),
        }
    }
}

/// Runs loader and unloader commands
///
/// Implementations must block until the command has finished. The manager never
/// issues a second command while one is outstanding.
pub trait ProcessLauncher {
    fn launch(&self, command: &ModuleCommand) -> LaunchOutcome;
}

impl<T: ProcessLauncher + ?Sized> ProcessLauncher for &T {
    fn launch(&self, command: &ModuleCommand) -> LaunchOutcome {
        (**self).launch(command)
    }
}

impl<T: ProcessLauncher + ?Sized> ProcessLauncher for Box<T> {
    fn launch(&self, command: &ModuleCommand) -> LaunchOutcome {
        (**self).launch(command)
    }
}

/// Kernel module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Module {0} is already registered")]
    DuplicateModule(String),

    #[error("Cyclic module dependency: {}", .chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },

    #[error("Command '{command}' for module {module} {outcome}")]
    CommandFailed {
        module: String,
        command: String,
        outcome: LaunchOutcome,
    },

    #[error("Config store error: {0}")]
    ConfigStore(#[from] ConfigStoreError),
}

impl ModuleError {
    /// Whether the error signals corrupted configuration or a programming defect
    /// rather than a failed command
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            ModuleError::ModuleNotFound(_) | ModuleError::CyclicDependency { .. }
        )
    }
}
