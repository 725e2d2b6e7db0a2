//! Configuration management for kmod-supervisor
//!
//! Handles daemon configuration loading and validation. The per-module settings
//! themselves come from the hierarchical config store (see [`tree`]).

pub mod tree;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use tree::{ConfigNode, ConfigStore, ConfigStoreError, NodeType, ReadTxn, TreeConfigStore};

/// Kernel module manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelModuleConfig {
    /// Directory holding the `.ko` images
    #[serde(default = "default_module_dir")]
    pub module_dir: String,

    /// Config store node whose children are the module entries
    #[serde(default = "default_config_root")]
    pub config_root: String,

    /// Extension marking a config entry as a kernel module
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Absolute path of the loader executable
    #[serde(default = "default_load_command")]
    pub load_command: String,

    /// Absolute path of the unloader executable
    #[serde(default = "default_unload_command")]
    pub unload_command: String,

    /// Maximum number of parameters passed to one module
    #[serde(default = "default_max_parameters")]
    pub max_parameters: usize,

    /// Maximum number of required modules per module
    #[serde(default = "default_max_dependencies")]
    pub max_dependencies: usize,
}

fn default_module_dir() -> String {
    "/system/modules".to_string()
}

fn default_config_root() -> String {
    "/modules".to_string()
}

fn default_file_extension() -> String {
    ".ko".to_string()
}

fn default_load_command() -> String {
    "/sbin/insmod".to_string()
}

fn default_unload_command() -> String {
    "/sbin/rmmod".to_string()
}

fn default_max_parameters() -> usize {
    256
}

fn default_max_dependencies() -> usize {
    256
}

impl Default for KernelModuleConfig {
    fn default() -> Self {
        Self {
            module_dir: default_module_dir(),
            config_root: default_config_root(),
            file_extension: default_file_extension(),
            load_command: default_load_command(),
            unload_command: default_unload_command(),
            max_parameters: default_max_parameters(),
            max_dependencies: default_max_dependencies(),
        }
    }
}

impl KernelModuleConfig {
    /// Path of a module image given its config entry name (`foo.ko`)
    pub fn module_path(&self, entry_name: &str) -> PathBuf {
        Path::new(&self.module_dir).join(entry_name)
    }

    /// Validate kernel module configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (what, command) in [
            ("load_command", &self.load_command),
            ("unload_command", &self.unload_command),
        ] {
            if !Path::new(command).is_absolute() {
                return Err(anyhow::anyhow!(
                    "{} must be an absolute path, got '{}'",
                    what,
                    command
                ));
            }
        }

        if !self.config_root.starts_with('/') {
            return Err(anyhow::anyhow!(
                "config_root must start with '/', got '{}'",
                self.config_root
            ));
        }

        if self.file_extension.len() < 2 || !self.file_extension.starts_with('.') {
            return Err(anyhow::anyhow!(
                "file_extension must look like '.ko', got '{}'",
                self.file_extension
            ));
        }

        if self.max_parameters == 0 {
            return Err(anyhow::anyhow!("max_parameters must be greater than 0"));
        }

        if self.max_dependencies == 0 {
            return Err(anyhow::anyhow!("max_dependencies must be greater than 0"));
        }

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "kmod_supervisor=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Supervisor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Kernel module manager settings
    #[serde(default)]
    pub kernel_modules: KernelModuleConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: Option<LoggingConfig>,

    /// TOML file backing the config store
    #[serde(default)]
    pub config_store: Option<String>,
}

impl SupervisorConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SupervisorConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SupervisorConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration, picking the format from the file extension
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.kernel_modules.validate()?;

        if let Some(ref store) = self.config_store {
            if store.is_empty() {
                return Err(anyhow::anyhow!("config_store path cannot be empty"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = SupervisorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kernel_modules.max_parameters, 256);
        assert_eq!(
            config.kernel_modules.module_path("foo.ko"),
            PathBuf::from("/system/modules/foo.ko")
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SupervisorConfig = toml::from_str(
            r#"
config_store = "/etc/kmod/store.toml"

[kernel_modules]
module_dir = "/lib/modules/extra"
max_parameters = 8

[logging]
filter = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.kernel_modules.module_dir, "/lib/modules/extra");
        assert_eq!(config.kernel_modules.max_parameters, 8);
        assert_eq!(config.kernel_modules.load_command, "/sbin/insmod");
        assert_eq!(
            config.logging.and_then(|l| l.filter).as_deref(),
            Some("debug")
        );
        assert!(config.config_store.is_some());
    }

    #[test]
    fn test_relative_command_rejected() {
        let mut config = KernelModuleConfig::default();
        config.load_command = "insmod".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_extension_and_limits_rejected() {
        let mut config = KernelModuleConfig::default();
        config.file_extension = "ko".to_string();
        assert!(config.validate().is_err());

        let mut config = KernelModuleConfig::default();
        config.max_dependencies = 0;
        assert!(config.validate().is_err());
    }
}
