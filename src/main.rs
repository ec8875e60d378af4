//! tactile-daemon: spoken feedback for an audio-first recording surface
//!
//! This daemon backs a single touch surface and provides:
//! - Session state (recording, category, playback speed) with one
//!   announcement per transition
//! - Routing of announcements to the screen reader or to synthesized speech,
//!   following the system screen-reader setting as it changes
//! - IPC server for the UI layer to drive the session and observe it
//!
//! Rendering, gestures and haptics live in the UI process.

mod accessibility;
mod config;
mod events;
mod feedback;
mod ipc;
mod lifecycle;
mod platform;
mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::accessibility::AccessibilityStatusMonitor;
use crate::config::Config;
use crate::events::SessionEvent;
use crate::feedback::FeedbackRouter;
use crate::ipc::{Server, SessionHandle};
use crate::lifecycle::ShutdownSignal;
use crate::state::SessionStateMachine;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "tactile-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, backend = ?config.backend, "configuration loaded");

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Create channels for inter-component communication
    // Accessibility listener -> session
    let (status_tx, status_rx) = mpsc::channel(8);
    // IPC clients -> session
    let (command_tx, command_rx) = mpsc::channel(32);
    // Session -> subscribed IPC clients
    let (event_tx, _event_rx) = broadcast::channel::<SessionEvent>(64);

    let (source, channels) = platform::build(&config);

    // Seeds the assistive-mode flag from the current system setting.
    // Both the seed query and audio setup shell out and block.
    let monitor = Arc::new(tokio::task::block_in_place(|| {
        AccessibilityStatusMonitor::new(source)
    }));

    let router = FeedbackRouter::new(channels, monitor.mode(), config.router_options());
    tokio::task::block_in_place(|| router.configure());

    match monitor.start(status_tx) {
        Ok(()) => {
            info!("accessibility listener started");
        }
        Err(e) => {
            error!(?e, "failed to start accessibility listener");
            warn!("continuing with assistive mode fixed at its startup value");
        }
    }

    let mut session = SessionStateMachine::new(
        router,
        Arc::clone(&monitor),
        config.session_options(),
        event_tx.clone(),
    );

    let server = Server::new(
        &config.socket_path,
        SessionHandle {
            command_tx,
            event_tx,
            snapshots: session.subscribe_snapshots(),
        },
    )?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the session (the only place state changes and announcements happen)
        _ = session.run(command_rx, status_rx) => {
            info!("session exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    monitor.stop();
    server.shutdown().await;

    info!("tactile-daemon stopped");

    Ok(())
}
