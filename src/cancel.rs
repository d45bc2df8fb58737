//! Interrupt flag shared between the Ctrl-C listener and long-running work

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::error::{ClonerError, Result};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable cancellation flag.
///
/// Loops poll [`CancelFlag::check`] between repositories; anything that can
/// wait indefinitely (HTTP requests, cooldown sleeps) races against
/// [`CancelFlag::cancelled`] instead.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<Inner>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag is set
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ClonerError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the flag is set; immediately if it already is
    pub async fn cancelled(&self) {
        let notified = self.0.notify.notified();
        tokio::pin!(notified);
        // Register before re-checking so a concurrent cancel() is not missed
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
