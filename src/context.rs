//! Per-call cancellation and deadline carrier.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{FloodControlError, Result};

/// Carries a caller's cancellation signal and optional deadline into a check.
///
/// Clones share the same cancellation flag, so a request handler can keep one
/// copy and cancel the work it handed off with another.
#[derive(Debug, Clone, Default)]
pub struct CheckContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CheckContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// A context that expires `timeout` from now.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail if the context is already cancelled or past its deadline.
    ///
    /// Explicit cancellation takes precedence over an expired deadline.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(FloodControlError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(FloodControlError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
