//! Signal handling for orderly shutdown
//!
//! The supervisor installs modules at start and removes them when it is asked to
//! stop. The handlers are registered before installation begins, so a stop request
//! that arrives during start-up is queued instead of killing the process.

use std::io;
use tokio::runtime::{Builder, Runtime};
use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Registered SIGTERM/SIGINT handlers plus the runtime that drives them
///
/// The kernel module manager is synchronous; this owns a small current-thread
/// runtime just for the wait.
pub struct ShutdownListener {
    runtime: Runtime,
    #[cfg(unix)]
    sigterm: Signal,
    #[cfg(unix)]
    sigint: Signal,
}

impl ShutdownListener {
    /// Install the handlers. Signals delivered from here on are not lost.
    pub fn register() -> io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        #[cfg(unix)]
        let (sigterm, sigint) = {
            let _guard = runtime.enter();
            (
                signal(SignalKind::terminate())?,
                signal(SignalKind::interrupt())?,
            )
        };

        Ok(Self {
            runtime,
            #[cfg(unix)]
            sigterm,
            #[cfg(unix)]
            sigint,
        })
    }

    /// Block the calling thread until SIGTERM or SIGINT (Ctrl+C elsewhere)
    #[cfg(unix)]
    pub fn wait(self) {
        let Self {
            runtime,
            mut sigterm,
            mut sigint,
        } = self;

        runtime.block_on(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down...");
                }
            }
        });
    }

    #[cfg(not(unix))]
    pub fn wait(self) {
        self.runtime.block_on(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C, shutting down..."),
                Err(e) => tracing::warn!("Failed to listen for shutdown signal: {}", e),
            }
        });
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use nix::sys::signal::{raise, Signal as NixSignal};

    #[test]
    fn test_signal_before_wait_is_not_lost() {
        let listener = ShutdownListener::register().unwrap();
        // Delivered while the supervisor would still be installing modules
        raise(NixSignal::SIGTERM).unwrap();
        listener.wait();
    }
}
