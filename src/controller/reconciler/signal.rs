//! # Reconcile Signal
//!
//! Cancellation and deadline handed to a single reconciliation by its caller.

use crate::controller::reconciler::types::ReconcilerError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Fires when the caller cancels or the deadline passes
#[derive(Debug, Clone)]
pub struct ReconcileSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ReconcileSignal {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// A signal that never fires
    pub fn never() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Also fire `after` from now
    #[must_use]
    pub fn with_deadline(mut self, after: Duration) -> Self {
        self.deadline = Instant::now().checked_add(after);
        self
    }

    /// Resolves once the signal fires, with the error to report
    pub async fn fired(&self) -> ReconcilerError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => ReconcilerError::Cancelled,
                    () = tokio::time::sleep_until(deadline) => ReconcilerError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ReconcilerError::Cancelled
            }
        }
    }
}
