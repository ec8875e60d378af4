//! Signal handling for graceful shutdown

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, warn};

/// Handles shutdown signals (SIGTERM, SIGINT)
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal
    ///
    /// A signal that cannot be registered is skipped. If neither can be,
    /// this waits forever and the daemon only stops when killed.
    pub async fn wait(&self) {
        let mut sigterm = register(SignalKind::terminate(), "SIGTERM");
        let mut sigint = register(SignalKind::interrupt(), "SIGINT");

        tokio::select! {
            _ = recv(&mut sigterm) => {
                debug!("received SIGTERM");
            }
            _ = recv(&mut sigint) => {
                debug!("received SIGINT");
            }
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

fn register(kind: SignalKind, name: &str) -> Option<Signal> {
    match signal(kind) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(?e, signal = name, "failed to register signal handler");
            None
        }
    }
}

async fn recv(signal: &mut Option<Signal>) {
    match signal {
        Some(s) => {
            s.recv().await;
        }
        None => std::future::pending().await,
    }
}

