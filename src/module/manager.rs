//! Kernel module manager
//!
//! Owns the module registry and drives every module through its lifecycle:
//! resolving the dependency sequence for a request, keeping use counts, and running
//! the loader/unloader commands one at a time in resolved order.
//!
//! The manager is the supervisor's context object for kernel modules. All state
//! lives here and every operation takes `&mut self`, so there is exactly one
//! thread of control over the registry.

use std::collections::HashSet;
use tracing::{debug, error, info};

use crate::config::{ConfigStore, KernelModuleConfig};
use crate::module::loader::ModuleCommand;
use crate::module::registry::{
    ConfigImporter, DependencyResolver, ModuleDescriptor, ModuleRegistry, ResolvedSequence,
};
use crate::module::traits::{LoadStatus, ModuleError, ProcessLauncher};

/// Kernel module lifecycle manager
pub struct KernelModuleManager<S, L> {
    /// Loader paths, config layout and limits
    config: KernelModuleConfig,
    /// Source of per-module settings
    store: S,
    /// Runs loader/unloader commands
    launcher: L,
    /// Imported modules
    registry: ModuleRegistry,
}

impl<S: ConfigStore, L: ProcessLauncher> KernelModuleManager<S, L> {
    /// Create a manager with an empty registry
    pub fn new(config: KernelModuleConfig, store: S, launcher: L) -> Self {
        debug!(
            "Kernel module manager initialized (modules in {}, config root {})",
            config.module_dir, config.config_root
        );
        Self {
            config,
            store,
            launcher,
            registry: ModuleRegistry::new(),
        }
    }

    pub fn config(&self) -> &KernelModuleConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn descriptor(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.registry.lookup(self.module_name(name))
    }

    /// Dependency sequence reachable from `name`
    pub fn resolve(&self, name: &str) -> Result<ResolvedSequence, ModuleError> {
        DependencyResolver::resolve(&self.registry, self.module_name(name))
    }

    /// Accept both `foo` and `foo.ko`
    fn module_name<'n>(&self, name: &'n str) -> &'n str {
        name.strip_suffix(self.config.file_extension.as_str())
            .unwrap_or(name)
    }

    /// Scan the config store and register every kernel module found
    pub fn import_modules(&mut self) -> Result<usize, ModuleError> {
        ConfigImporter::new(&self.config).import_all(&self.store, &mut self.registry)
    }

    /// Import all modules, then install every automatic one
    ///
    /// Stops at the first chain that fails; modules installed before it stay
    /// installed.
    pub fn insert_all(&mut self) -> Result<(), ModuleError> {
        self.import_modules()?;

        info!("Installing automatic kernel modules");
        for name in self.registry.names() {
            let manual = self.registry.get(&name)?.is_manual();
            if manual {
                continue;
            }

            if let Err(e) = self.install_module(&name) {
                error!("Error in installing module {}: {}", name, e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Supervisor start-up: install every automatic module
    ///
    /// A failed loader command leaves the system partially installed but
    /// consistent, so it is logged and start-up continues. A missing dependency or
    /// a cycle means the module configuration itself is broken and is returned, as
    /// is an unreadable config store.
    pub fn start(&mut self) -> Result<(), ModuleError> {
        match self.insert_all() {
            Ok(()) => Ok(()),
            Err(e) if e.is_invariant_violation() => {
                error!("Inconsistent kernel module configuration: {}", e);
                Err(e)
            }
            Err(e @ ModuleError::CommandFailed { .. }) => {
                error!("Kernel module installation incomplete: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Install the named modules, whatever their load mode
    ///
    /// An automatic module that is already installed is skipped. An unknown name
    /// is an error.
    pub fn insert_list<I, N>(&mut self, names: I) -> Result<(), ModuleError>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        for name in names {
            let name = self.module_name(name.as_ref()).to_string();
            let module = self.registry.get(&name)?;

            if !module.is_manual() && module.load_status() == LoadStatus::Installed {
                debug!("Automatic module {} already installed, skipping", name);
                continue;
            }

            if let Err(e) = self.install_module(&name) {
                error!("Error in installing module {}: {}", name, e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove the named manual modules; automatic names are skipped
    pub fn remove_list<I, N>(&mut self, names: I) -> Result<(), ModuleError>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        for name in names {
            let name = self.module_name(name.as_ref()).to_string();
            if !self.registry.get(&name)?.is_manual() {
                debug!("Module {} is loaded automatically, not removing", name);
                continue;
            }

            if let Err(e) = self.remove_module(&name) {
                error!("Error in removing module {}: {}", name, e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove every automatic module, then release all descriptors
    ///
    /// The registry is emptied even if a removal fails; the first failure is
    /// returned.
    pub fn remove_all(&mut self) -> Result<(), ModuleError> {
        info!("Removing automatic kernel modules");

        let mut result = Ok(());
        for name in self.registry.names() {
            let manual = self.registry.get(&name)?.is_manual();
            if manual {
                continue;
            }

            if let Err(e) = self.remove_module(&name) {
                error!("Error in removing module {}: {}", name, e);
                result = Err(e);
                break;
            }
        }

        self.registry.clear();
        result
    }

    /// Install one module and everything it requires
    fn install_module(&mut self, name: &str) -> Result<(), ModuleError> {
        self.restore_released_settings(name)?;
        let sequence = DependencyResolver::resolve(&self.registry, name)?;

        for module in sequence.install_order() {
            self.install_step(module)?;
        }
        Ok(())
    }

    /// Remove one module and release everything it requires
    fn remove_module(&mut self, name: &str) -> Result<(), ModuleError> {
        let sequence = DependencyResolver::resolve(&self.registry, name)?;

        for module in sequence.remove_order() {
            self.remove_step(module)?;
        }
        Ok(())
    }

    /// Take one reference on `name`, loading it if it is not installed yet
    fn install_step(&mut self, name: &str) -> Result<(), ModuleError> {
        let module = self.registry.get_mut(name)?;
        module.acquire();

        let prior = module.load_status();
        if prior == LoadStatus::Installed {
            debug!(
                "Module {} already installed (use count {})",
                name,
                module.use_count()
            );
            return Ok(());
        }

        // Trying is held only while the loader is outstanding
        module.set_load_status(LoadStatus::Trying);
        let command = ModuleCommand::load(&self.config.load_command, module);
        let outcome = self.launcher.launch(&command);

        if !outcome.is_success() {
            module.set_load_status(prior);
            module.release();
            return Err(ModuleError::CommandFailed {
                module: name.to_string(),
                command: command.to_string(),
                outcome,
            });
        }

        module.set_load_status(LoadStatus::Installed);
        info!("New kernel module {}", name);
        Ok(())
    }

    /// Drop one reference on `name`, unloading it once nothing holds it
    fn remove_step(&mut self, name: &str) -> Result<(), ModuleError> {
        let module = self.registry.get_mut(name)?;
        module.release();

        if module.use_count() > 0 {
            debug!(
                "Module {} is installed and not yet ready to be removed (use count {})",
                name,
                module.use_count()
            );
            return Ok(());
        }

        let prior = module.load_status();
        if prior == LoadStatus::Removed {
            return Ok(());
        }

        module.set_load_status(LoadStatus::Trying);
        let command = ModuleCommand::unload(&self.config.unload_command, module);
        let outcome = self.launcher.launch(&command);

        if !outcome.is_success() {
            module.set_load_status(prior);
            return Err(ModuleError::CommandFailed {
                module: name.to_string(),
                command: command.to_string(),
                outcome,
            });
        }

        module.set_load_status(LoadStatus::Removed);
        module.release_settings();
        info!("Removed kernel module {}", name);
        Ok(())
    }

    /// Re-import settings dropped by an earlier unload, for `root` and everything
    /// it requires
    fn restore_released_settings(&mut self, root: &str) -> Result<(), ModuleError> {
        let importer = ConfigImporter::new(&self.config);
        let mut pending = vec![root.to_string()];
        let mut seen = HashSet::new();

        while let Some(name) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            // Unknown names are reported by the resolver
            let Some(module) = self.registry.lookup_mut(&name) else {
                continue;
            };
            if module.settings_released() {
                importer.reload(&self.store, module)?;
            }
            pending.extend(module.required_modules().iter().cloned());
        }
        Ok(())
    }
}
