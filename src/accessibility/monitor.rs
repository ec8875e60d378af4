//! Assistive-mode flag and the listener that keeps it current
//!
//! The listener only forwards change notifications. The flag itself is
//! overwritten by `refresh()`, which the session actor calls, so flag
//! updates are serialized with announcement routing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::source::{AccessibilityError, AccessibilityStatusSource};

/// Longest a refresh waits for the source before keeping the old value
const REFRESH_TIMEOUT: Duration = Duration::from_secs(3);

/// Notification forwarded from the listener to the session actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChanged;

/// Read-only handle to the assistive-mode flag
#[derive(Debug, Clone)]
pub struct AssistiveMode(Arc<AtomicBool>);

impl AssistiveMode {
    /// Flag value at the last observed notification. Never blocks.
    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns the assistive-mode flag and the subscription that updates it
pub struct AccessibilityStatusMonitor {
    source: Arc<dyn AccessibilityStatusSource>,
    flag: Arc<AtomicBool>,
    listener: Mutex<Option<JoinHandle<()>>>,
    refresh_timeout: Duration,
}

impl AccessibilityStatusMonitor {
    /// Create a monitor seeded from the source's current value
    pub fn new(source: Arc<dyn AccessibilityStatusSource>) -> Self {
        let active = source.is_assistive_mode_active();
        info!(assistive_mode = active, "accessibility status seeded");

        Self {
            source,
            flag: Arc::new(AtomicBool::new(active)),
            listener: Mutex::new(None),
            refresh_timeout: REFRESH_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Handle for readers of the flag
    pub fn mode(&self) -> AssistiveMode {
        AssistiveMode(Arc::clone(&self.flag))
    }

    /// Current flag value
    pub fn is_active(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Start forwarding change notifications to `event_tx`
    ///
    /// Spawns a task on the current tokio runtime that waits indefinitely
    /// for the next notification. It runs until `stop()` is called or the
    /// receiving side of `event_tx` is dropped.
    pub fn start(&self, event_tx: mpsc::Sender<StatusChanged>) -> Result<(), AccessibilityError> {
        let mut listener = self.lock_listener();
        if listener.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(AccessibilityError::AlreadyRunning);
        }

        let mut notifications = self.source.subscribe()?;

        let handle = tokio::spawn(async move {
            debug!("accessibility listener started");

            while notifications.recv().await.is_some() {
                if event_tx.send(StatusChanged).await.is_err() {
                    debug!("status receiver closed");
                    break;
                }
            }

            info!("accessibility listener stopped");
        });

        *listener = Some(handle);
        Ok(())
    }

    /// Re-read the external condition and overwrite the flag
    ///
    /// The point query may block, so it runs on the blocking pool. If it
    /// fails or outlasts the refresh timeout the flag keeps its value.
    /// Returns the new value.
    pub async fn refresh(&self) -> bool {
        let source = Arc::clone(&self.source);
        let query = tokio::task::spawn_blocking(move || source.is_assistive_mode_active());

        let active = match tokio::time::timeout(self.refresh_timeout, query).await {
            Ok(Ok(active)) => active,
            Ok(Err(e)) => {
                warn!(?e, "accessibility status query failed, keeping previous value");
                return self.is_active();
            }
            Err(_) => {
                warn!(
                    timeout = ?self.refresh_timeout,
                    "accessibility status query timed out, keeping previous value"
                );
                return self.is_active();
            }
        };
        let previous = self.flag.swap(active, Ordering::SeqCst);

        if previous != active {
            info!(from = previous, to = active, "assistive mode changed");
        } else {
            debug!(assistive_mode = active, "accessibility notification, no change");
        }

        active
    }

    /// Cancel the listener and release the subscription
    pub fn stop(&self) {
        if let Some(handle) = self.lock_listener().take() {
            handle.abort();
            debug!("accessibility listener cancelled");
        }
    }

    /// Check if the listener task is alive
    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.lock_listener()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(|poisoned| {
            warn!("accessibility listener lock poisoned");
            poisoned.into_inner()
        })
    }
}

impl Drop for AccessibilityStatusMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
