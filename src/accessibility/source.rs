//! Boundary to the external accessibility status

use tokio::sync::mpsc;

/// External source of the "assistive technology active" condition
pub trait AccessibilityStatusSource: Send + Sync {
    /// Point query of the current condition
    fn is_assistive_mode_active(&self) -> bool;

    /// Subscribe to change notifications
    ///
    /// Each `()` means the condition may have changed. Dropping the
    /// receiver releases the subscription.
    fn subscribe(&self) -> Result<mpsc::Receiver<()>, AccessibilityError>;
}

/// Errors from the accessibility status source
#[derive(Debug, thiserror::Error)]
pub enum AccessibilityError {
    #[error("failed to subscribe to accessibility status changes: {0}")]
    Subscribe(String),

    #[error("accessibility monitor is already running")]
    AlreadyRunning,
}
