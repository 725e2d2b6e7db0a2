//! Module dependency resolution
//!
//! Walks the dependency graph depth-first from one module and records every module
//! reached, in discovery order. Nothing is de-duplicated: a module reachable through
//! N requiring paths appears N times, one appearance per reference it holds or
//! releases.
//!
//! - Install processes the sequence last-discovered-first, so each dependency is
//!   handled before the module that required it.
//! - Remove processes it first-discovered-first, so dependents release their
//!   references before a dependency's use count can reach zero.

use std::collections::HashSet;
use tracing::debug;

use crate::module::registry::table::ModuleRegistry;
use crate::module::traits::ModuleError;

/// Discovery-ordered module sequence for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSequence {
    discovered: Vec<String>,
}

impl ResolvedSequence {
    /// Modules in the order the walk reached them
    pub fn discovered(&self) -> &[String] {
        &self.discovered
    }

    /// Processing order for install: dependencies first
    pub fn install_order(&self) -> impl Iterator<Item = &str> {
        self.discovered.iter().rev().map(String::as_str)
    }

    /// Processing order for removal: dependents first
    pub fn remove_order(&self) -> impl Iterator<Item = &str> {
        self.discovered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.discovered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discovered.is_empty()
    }
}

/// One module on the current walk path and the next dependency to visit
struct Frame<'r> {
    name: &'r str,
    requires: &'r [String],
    next: usize,
}

/// Dependency resolver
pub struct DependencyResolver;

impl DependencyResolver {
    /// Resolve the sequence reachable from `root`
    ///
    /// Fails with `ModuleNotFound` if `root` or any dependency is not registered, and
    /// with `CyclicDependency` if the walk reaches a module already on its own path.
    pub fn resolve(registry: &ModuleRegistry, root: &str) -> Result<ResolvedSequence, ModuleError> {
        let root_module = registry.get(root)?;

        let mut discovered = vec![root_module.name().to_string()];
        let mut on_path: HashSet<&str> = HashSet::from([root_module.name()]);
        let mut stack = vec![Frame {
            name: root_module.name(),
            requires: root_module.required_modules(),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let parent = frame.name;
            let requires = frame.requires;
            let Some(required) = requires.get(frame.next) else {
                on_path.remove(parent);
                stack.pop();
                continue;
            };
            frame.next += 1;

            if on_path.contains(required.as_str()) {
                let start = stack
                    .iter()
                    .position(|f| f.name == required.as_str())
                    .unwrap_or(0);
                let mut chain: Vec<String> =
                    stack[start..].iter().map(|f| f.name.to_string()).collect();
                chain.push(required.clone());
                return Err(ModuleError::CyclicDependency { chain });
            }

            let module = registry.lookup(required).ok_or_else(|| {
                ModuleError::ModuleNotFound(format!("{} (required by {})", required, parent))
            })?;

            discovered.push(module.name().to_string());
            on_path.insert(module.name());
            stack.push(Frame {
                name: module.name(),
                requires: module.required_modules(),
                next: 0,
            });
        }

        debug!("Resolved dependencies of {}: {:?}", root, discovered);
        Ok(ResolvedSequence { discovered })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::registry::descriptor::{ModuleDescriptor, ModuleLimits};

    fn registry(graph: &[(&str, &[&str])]) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        for (name, requires) in graph {
            let mut d = ModuleDescriptor::new(
                *name,
                format!("/system/modules/{}.ko", name),
                ModuleLimits::default(),
            );
            for r in *requires {
                d.push_required_module(r.to_string());
            }
            registry.register(d).unwrap();
        }
        registry
    }

    #[test]
    fn test_single_module() {
        let reg = registry(&[("a", &[])]);
        let seq = DependencyResolver::resolve(&reg, "a").unwrap();
        assert_eq!(seq.discovered(), ["a"]);
    }

    #[test]
    fn test_chain_install_order_is_dependencies_first() {
        let reg = registry(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        let seq = DependencyResolver::resolve(&reg, "a").unwrap();
        assert_eq!(seq.discovered(), ["a", "b", "c"]);
        assert_eq!(seq.install_order().collect::<Vec<_>>(), ["c", "b", "a"]);
        assert_eq!(seq.remove_order().collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_keeps_duplicates() {
        let reg = registry(&[("x", &["a", "b"]), ("a", &["c"]), ("b", &["c"]), ("c", &[])]);
        let seq = DependencyResolver::resolve(&reg, "x").unwrap();
        assert_eq!(seq.discovered(), ["x", "a", "c", "b", "c"]);
        assert_eq!(
            seq.install_order().collect::<Vec<_>>(),
            ["c", "b", "c", "a", "x"]
        );
    }

    #[test]
    fn test_missing_dependency() {
        let reg = registry(&[("a", &["ghost"])]);
        let err = DependencyResolver::resolve(&reg, "a").unwrap_err();
        assert!(matches!(err, ModuleError::ModuleNotFound(msg) if msg.contains("ghost")));
    }

    #[test]
    fn test_missing_root() {
        let reg = registry(&[]);
        assert!(matches!(
            DependencyResolver::resolve(&reg, "nope"),
            Err(ModuleError::ModuleNotFound(_))
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let reg = registry(&[("a", &["b"]), ("b", &["c"]), ("c", &["b"])]);
        let err = DependencyResolver::resolve(&reg, "a").unwrap_err();
        match err {
            ModuleError::CyclicDependency { chain } => assert_eq!(chain, ["b", "c", "b"]),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let reg = registry(&[("a", &["a"])]);
        assert!(matches!(
            DependencyResolver::resolve(&reg, "a"),
            Err(ModuleError::CyclicDependency { .. })
        ));
    }
}
