//! Loader process spawning
//!
//! Runs loader/unloader executables as child processes and classifies how they
//! finished. The calling thread blocks until the child exits; there is no timeout.

use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, error, info};

use crate::module::loader::ModuleCommand;
use crate::module::traits::{LaunchOutcome, ProcessLauncher};

/// Launches commands as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandLauncher;

impl CommandLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for CommandLauncher {
    fn launch(&self, command: &ModuleCommand) -> LaunchOutcome {
        debug!("Execute '{}'", command);

        // status() retries the wait when it is interrupted by a signal
        let status = match Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .status()
        {
            Ok(status) => status,
            Err(e) => {
                error!("Failed to run '{}': {}", command, e);
                return LaunchOutcome::LaunchFailure(e.to_string());
            }
        };

        let outcome = classify(status);
        match &outcome {
            LaunchOutcome::Success => {}
            LaunchOutcome::Signaled(sig) => error!(
                "{} was killed by a signal {} ({}).",
                command.program().display(),
                sig,
                signal_name(*sig)
            ),
            other => error!("{} {}.", command.program().display(), other),
        }
        outcome
    }
}

/// Map a child's exit status onto a launch outcome
pub fn classify(status: ExitStatus) -> LaunchOutcome {
    if let Some(code) = status.code() {
        return if code == 0 {
            LaunchOutcome::Success
        } else {
            LaunchOutcome::ExitCode(code)
        };
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return LaunchOutcome::Signaled(sig);
        }
    }

    LaunchOutcome::LaunchFailure(format!("unrecognized exit status: {}", status))
}

#[cfg(unix)]
fn signal_name(sig: i32) -> &'static str {
    nix::sys::signal::Signal::try_from(sig)
        .map(|s| s.as_str())
        .unwrap_or("unknown")
}

#[cfg(not(unix))]
fn signal_name(_sig: i32) -> &'static str {
    "unknown"
}

/// Logs commands instead of running them; every command succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunLauncher;

impl ProcessLauncher for DryRunLauncher {
    fn launch(&self, command: &ModuleCommand) -> LaunchOutcome {
        info!("[dry-run] {}", command);
        LaunchOutcome::Success
    }
}
