//! Module import from the config store
//!
//! Scans the module root of the config store and builds one descriptor per entry
//! named `<module><extension>`. Bad entries are skipped with a warning; only an
//! unreadable store is an error.

use tracing::{debug, info, warn};

use crate::config::{ConfigNode, ConfigStore, KernelModuleConfig, ReadTxn};
use crate::module::registry::descriptor::{format_parameter, ModuleDescriptor, ModuleLimits};
use crate::module::registry::table::ModuleRegistry;
use crate::module::traits::{LoadMode, ModuleError};

const LOAD_MANUAL_NODE: &str = "loadManual";
const PARAMS_NODE: &str = "params";
const REQUIRED_MODULES_NODE: &str = "requires/kernelModules";

/// Builds descriptors from config store entries
pub struct ConfigImporter<'a> {
    config: &'a KernelModuleConfig,
}

impl<'a> ConfigImporter<'a> {
    pub fn new(config: &'a KernelModuleConfig) -> Self {
        Self { config }
    }

    pub fn limits(&self) -> ModuleLimits {
        ModuleLimits {
            max_parameters: self.config.max_parameters,
            max_dependencies: self.config.max_dependencies,
        }
    }

    /// Module name for a config entry or dependency reference: the extension is
    /// stripped when present
    pub fn module_name<'n>(&self, entry_name: &'n str) -> &'n str {
        entry_name
            .strip_suffix(self.config.file_extension.as_str())
            .unwrap_or(entry_name)
    }

    /// Config entry name for a module name
    pub fn entry_name(&self, module_name: &str) -> String {
        format!("{}{}", module_name, self.config.file_extension)
    }

    fn entry_path(&self, entry_name: &str) -> String {
        format!(
            "{}/{}",
            self.config.config_root.trim_end_matches('/'),
            entry_name
        )
    }

    /// Import every kernel module entry under the config root into `registry`
    ///
    /// Returns the number of modules registered.
    pub fn import_all<S: ConfigStore + ?Sized>(
        &self,
        store: &S,
        registry: &mut ModuleRegistry,
    ) -> Result<usize, ModuleError> {
        info!(
            "Importing kernel modules from config store {}",
            self.config.config_root
        );

        let root = store.read_txn(&self.config.config_root)?;
        if !root.exists() {
            info!("No kernel modules configured");
            return Ok(0);
        }

        let mut imported = 0;
        for (entry_name, _) in root.children("") {
            if entry_name.is_empty() {
                warn!("Found empty kernel module node");
                continue;
            }

            if !entry_name.ends_with(self.config.file_extension.as_str()) {
                debug!("Skipping config entry {} (not a kernel module)", entry_name);
                continue;
            }

            if self.module_name(entry_name).is_empty() {
                warn!("Found kernel module entry with empty name: {}", entry_name);
                continue;
            }

            let descriptor = self.import_module(store, entry_name)?;
            match registry.register(descriptor) {
                Ok(descriptor) => {
                    debug!(
                        "Imported module {} ({}, {} params, requires {:?})",
                        descriptor.name(),
                        descriptor.load_mode(),
                        descriptor.parameters().len(),
                        descriptor.required_modules()
                    );
                    imported += 1;
                }
                Err(ModuleError::DuplicateModule(name)) => {
                    warn!("Duplicate kernel module entry {}, keeping the first", name);
                }
                Err(e) => return Err(e),
            }
        }

        info!("Imported {} kernel modules", imported);
        Ok(imported)
    }

    /// Build a descriptor for one config entry (`foo.ko`)
    pub fn import_module<S: ConfigStore + ?Sized>(
        &self,
        store: &S,
        entry_name: &str,
    ) -> Result<ModuleDescriptor, ModuleError> {
        let name = self.module_name(entry_name);
        let mut descriptor =
            ModuleDescriptor::new(name, self.config.module_path(entry_name), self.limits());

        let txn = store.read_txn(&self.entry_path(entry_name))?;
        self.read_settings(&txn, &mut descriptor);
        Ok(descriptor)
    }

    /// Re-read a descriptor's settings from the store, keeping its status and use count
    pub fn reload<S: ConfigStore + ?Sized>(
        &self,
        store: &S,
        descriptor: &mut ModuleDescriptor,
    ) -> Result<(), ModuleError> {
        let entry_name = self.entry_name(descriptor.name());
        let txn = store.read_txn(&self.entry_path(&entry_name))?;

        descriptor.reset_settings();
        self.read_settings(&txn, descriptor);
        debug!("Reloaded settings for module {}", descriptor.name());
        Ok(())
    }

    fn read_settings(&self, txn: &ReadTxn, descriptor: &mut ModuleDescriptor) {
        let mode = if txn.get_bool(LOAD_MANUAL_NODE, false) {
            LoadMode::Manual
        } else {
            LoadMode::Automatic
        };
        descriptor.set_load_mode(mode);

        self.read_parameters(txn, descriptor);
        self.read_required_modules(txn, descriptor);
    }

    fn read_parameters(&self, txn: &ReadTxn, descriptor: &mut ModuleDescriptor) {
        let mut params = txn.children(PARAMS_NODE).peekable();
        if params.peek().is_none() {
            info!("Module {} uses no parameters.", descriptor.name());
            return;
        }

        for (param_name, node) in params {
            let Some(value) = node.as_text() else {
                warn!(
                    "Skipping parameter '{}' of module {}: value is not a scalar",
                    param_name,
                    descriptor.name()
                );
                continue;
            };

            if !descriptor.push_parameter(format_parameter(param_name, &value)) {
                warn!(
                    "Parameters list truncated for module '{}' (maximum {})",
                    descriptor.name(),
                    descriptor.limits().max_parameters
                );
                break;
            }
        }
    }

    fn read_required_modules(&self, txn: &ReadTxn, descriptor: &mut ModuleDescriptor) {
        for (_, node) in txn.children(REQUIRED_MODULES_NODE) {
            let required = match node {
                ConfigNode::String(s) => s,
                _ => {
                    warn!(
                        "Found non-string type kernel module dependency in module {}",
                        descriptor.name()
                    );
                    continue;
                }
            };

            let required = self.module_name(required);
            if required.is_empty() {
                warn!(
                    "Found empty kernel module dependency in module {}",
                    descriptor.name()
                );
                continue;
            }

            if !descriptor.push_required_module(required.to_string()) {
                warn!(
                    "Dependency list truncated for module '{}' (maximum {})",
                    descriptor.name(),
                    descriptor.limits().max_dependencies
                );
                break;
            }
        }
    }
}
