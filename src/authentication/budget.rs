//! Time and cancellation limits of one authentication call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth_errors::AuthError;

/// Optional deadline and cancellation flag checked between candidate and grid evaluations.
///
/// The default budget is unlimited. Cloning shares the cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct RunBudget {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl RunBudget {
    pub fn unlimited() -> Self {
        RunBudget::default()
    }

    /// Stop the call once `timeout` has elapsed from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop the call as soon as `flag` is set to `true`.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Fail with [`AuthError::Cancelled`] or [`AuthError::DeadlineExceeded`] when the
    /// budget is exhausted. Cancellation wins when both hold.
    pub fn check(&self) -> Result<(), AuthError> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Err(AuthError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(AuthError::DeadlineExceeded);
        }
        Ok(())
    }
}
