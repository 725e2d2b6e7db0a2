//! Module registry
//!
//! Owns every [`ModuleDescriptor`] keyed by its unique name. Iteration is in name
//! order, so whole-system passes visit modules in the same order on every run.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::module::registry::descriptor::ModuleDescriptor;
use crate::module::traits::ModuleError;

/// Name-keyed table of module descriptors
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor. A name that is already present is rejected and the
    /// existing entry is left untouched.
    pub fn register(
        &mut self,
        descriptor: ModuleDescriptor,
    ) -> Result<&mut ModuleDescriptor, ModuleError> {
        use std::collections::btree_map::Entry;

        match self.modules.entry(descriptor.name().to_string()) {
            Entry::Occupied(entry) => Err(ModuleError::DuplicateModule(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!("Registered module {}", descriptor.name());
                Ok(entry.insert(descriptor))
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.get(name)
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut ModuleDescriptor> {
        self.modules.get_mut(name)
    }

    /// Lookup that treats a missing entry as an error
    pub fn get(&self, name: &str) -> Result<&ModuleDescriptor, ModuleError> {
        self.lookup(name)
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut ModuleDescriptor, ModuleError> {
        self.lookup_mut(name)
            .ok_or_else(|| ModuleError::ModuleNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.values()
    }

    /// Snapshot of registered names, for passes that mutate while walking
    pub fn names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Release every descriptor, whatever state it ended in
    pub fn clear(&mut self) {
        info!("Releasing kernel modules memory");
        for (name, descriptor) in std::mem::take(&mut self.modules) {
            info!(
                "Released module '{}' ({}, use count {})",
                name,
                descriptor.load_status(),
                descriptor.use_count()
            );
        }
    }
}
