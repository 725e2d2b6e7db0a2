//! Loader and unloader command construction
//!
//! Commands are argument vectors handed straight to the executable: no shell is
//! involved, so parameter values reach the loader exactly as rendered.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::module::registry::descriptor::ModuleDescriptor;

/// Which side of the lifecycle a command drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Load,
    Unload,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Load => f.write_str("load"),
            CommandKind::Unload => f.write_str("unload"),
        }
    }
}

/// A fully built external command for one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCommand {
    kind: CommandKind,
    module: String,
    program: PathBuf,
    args: Vec<String>,
}

impl ModuleCommand {
    pub fn new(
        kind: CommandKind,
        module: impl Into<String>,
        program: impl Into<PathBuf>,
        args: Vec<String>,
    ) -> Self {
        Self {
            kind,
            module: module.into(),
            program: program.into(),
            args,
        }
    }

    /// `<loader> <module-path> <param>...`
    pub fn load(loader: impl AsRef<Path>, module: &ModuleDescriptor) -> Self {
        let mut args = Vec::with_capacity(module.parameters().len() + 1);
        args.push(module.path().to_string_lossy().into_owned());
        args.extend(module.parameters().iter().cloned());

        Self {
            kind: CommandKind::Load,
            module: module.name().to_string(),
            program: loader.as_ref().to_path_buf(),
            args,
        }
    }

    /// `<unloader> <module-name>`
    pub fn unload(unloader: impl AsRef<Path>, module: &ModuleDescriptor) -> Self {
        Self {
            kind: CommandKind::Unload,
            module: module.name().to_string(),
            program: unloader.as_ref().to_path_buf(),
            args: vec![module.name().to_string()],
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Name of the module the command acts on
    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ModuleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
