//! Kernel module descriptor
//!
//! One descriptor per kernel module known to the supervisor: where its image lives,
//! the parameters and dependencies imported from the config store, and its
//! runtime bookkeeping (load status and use count).

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::module::traits::{LoadMode, LoadStatus};

/// Per-descriptor ceilings, enforced when settings are appended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleLimits {
    pub max_parameters: usize,
    pub max_dependencies: usize,
}

impl Default for ModuleLimits {
    fn default() -> Self {
        Self {
            max_parameters: 256,
            max_dependencies: 256,
        }
    }
}

/// Render one `name=value` loader argument, quoting values that contain whitespace
pub fn format_parameter(name: &str, value: &str) -> String {
    if value.contains([' ', '\t', '\n']) {
        format!("{}=\"{}\"", name, value)
    } else {
        format!("{}={}", name, value)
    }
}

/// A kernel module known to the registry
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDescriptor {
    name: String,
    path: PathBuf,
    parameters: Vec<String>,
    required_modules: Vec<String>,
    load_status: LoadStatus,
    load_mode: LoadMode,
    use_count: u32,
    #[serde(skip)]
    limits: ModuleLimits,
    settings_released: bool,
}

impl ModuleDescriptor {
    /// Create a descriptor in `Init` state with no outstanding users
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, limits: ModuleLimits) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            parameters: Vec::new(),
            required_modules: Vec::new(),
            load_status: LoadStatus::Init,
            load_mode: LoadMode::Automatic,
            use_count: 0,
            limits,
            settings_released: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn required_modules(&self) -> &[String] {
        &self.required_modules
    }

    pub fn load_status(&self) -> LoadStatus {
        self.load_status
    }

    pub fn load_mode(&self) -> LoadMode {
        self.load_mode
    }

    pub fn is_manual(&self) -> bool {
        self.load_mode == LoadMode::Manual
    }

    pub fn use_count(&self) -> u32 {
        self.use_count
    }

    pub fn limits(&self) -> ModuleLimits {
        self.limits
    }

    /// Whether parameters and dependencies were dropped by a successful unload
    pub fn settings_released(&self) -> bool {
        self.settings_released
    }

    pub fn set_load_mode(&mut self, mode: LoadMode) {
        self.load_mode = mode;
    }

    pub(crate) fn set_load_status(&mut self, status: LoadStatus) {
        self.load_status = status;
    }

    /// Append a rendered parameter; `false` once `max_parameters` is reached
    pub fn push_parameter(&mut self, parameter: String) -> bool {
        if self.parameters.len() >= self.limits.max_parameters {
            return false;
        }
        self.parameters.push(parameter);
        true
    }

    /// Append a dependency name; `false` once `max_dependencies` is reached
    pub fn push_required_module(&mut self, name: String) -> bool {
        if self.required_modules.len() >= self.limits.max_dependencies {
            return false;
        }
        self.required_modules.push(name);
        true
    }

    /// One more install chain depends on this module
    pub(crate) fn acquire(&mut self) {
        self.use_count = self.use_count.saturating_add(1);
    }

    /// One install chain released this module. Never goes below zero.
    pub(crate) fn release(&mut self) {
        self.use_count = self.use_count.saturating_sub(1);
    }

    /// Drop imported parameters and dependencies after a successful unload
    pub(crate) fn release_settings(&mut self) {
        self.parameters = Vec::new();
        self.required_modules = Vec::new();
        self.settings_released = true;
    }

    /// Start over with freshly imported settings, keeping status and use count
    pub(crate) fn reset_settings(&mut self) {
        self.parameters.clear();
        self.required_modules.clear();
        self.settings_released = false;
    }
}
