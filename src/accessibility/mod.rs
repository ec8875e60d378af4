//! Accessibility status tracking
//!
//! Mirrors the system "screen reader active" condition into a flag the
//! feedback router reads on every announcement.

mod monitor;
mod source;

pub use monitor::{AccessibilityStatusMonitor, AssistiveMode, StatusChanged};
pub use source::{AccessibilityError, AccessibilityStatusSource};
