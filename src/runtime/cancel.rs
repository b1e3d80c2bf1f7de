//! Cooperative cancellation flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{Error, Result};

/// Shared flag checked by long-running loops at epoch and step boundaries
///
/// Clones observe the same flag. Cancelling never interrupts a step in
/// progress; the loop stops the next time it calls [`check`](Self::check).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once the token has been cancelled
    pub fn check(&self, context: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled(context.to_string()))
        } else {
            Ok(())
        }
    }
}
