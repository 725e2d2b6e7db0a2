//! Test utilities for kernel module manager tests
//!
//! Provides a launcher that records every command instead of running it, and
//! helpers for building managers over TOML config stores.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use kmod_supervisor::module::CommandKind;
use kmod_supervisor::{
    KernelModuleConfig, KernelModuleManager, LaunchOutcome, ModuleCommand, ProcessLauncher,
    TreeConfigStore,
};

/// Launcher that records commands and fails the ones it was told to
#[derive(Default)]
pub struct RecordingLauncher {
    commands: RefCell<Vec<ModuleCommand>>,
    failures: RefCell<HashMap<(CommandKind, String), LaunchOutcome>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `kind` command for `module` end with `outcome`
    pub fn fail(&self, kind: CommandKind, module: &str, outcome: LaunchOutcome) {
        self.failures
            .borrow_mut()
            .insert((kind, module.to_string()), outcome);
    }

    pub fn clear_failures(&self) {
        self.failures.borrow_mut().clear();
    }

    pub fn commands(&self) -> Vec<ModuleCommand> {
        self.commands.borrow().clone()
    }

    fn modules(&self, kind: CommandKind) -> Vec<String> {
        self.commands
            .borrow()
            .iter()
            .filter(|c| c.kind() == kind)
            .map(|c| c.module().to_string())
            .collect()
    }

    /// Modules a load command was issued for, in issue order
    pub fn loads(&self) -> Vec<String> {
        self.modules(CommandKind::Load)
    }

    /// Modules an unload command was issued for, in issue order
    pub fn unloads(&self) -> Vec<String> {
        self.modules(CommandKind::Unload)
    }

    pub fn count(&self, kind: CommandKind, module: &str) -> usize {
        self.modules(kind).iter().filter(|m| *m == module).count()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn launch(&self, command: &ModuleCommand) -> LaunchOutcome {
        self.commands.borrow_mut().push(command.clone());
        self.failures
            .borrow()
            .get(&(command.kind(), command.module().to_string()))
            .cloned()
            .unwrap_or(LaunchOutcome::Success)
    }
}

pub type TestManager = KernelModuleManager<TreeConfigStore, RecordingLauncher>;

/// Manager with default settings over a TOML config store
pub fn manager(store: &str) -> TestManager {
    manager_with(KernelModuleConfig::default(), store)
}

pub fn manager_with(config: KernelModuleConfig, store: &str) -> TestManager {
    let store = TreeConfigStore::from_toml_str(store).expect("valid test store");
    KernelModuleManager::new(config, store, RecordingLauncher::new())
}

/// Position of the first load command for `module`
pub fn load_position(launcher: &RecordingLauncher, module: &str) -> Option<usize> {
    launcher.loads().iter().position(|m| m == module)
}
