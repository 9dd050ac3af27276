//! Run cancellation: one shared token observed by every probe and by the admission gate.
//!
//! The token fires either when `cancel()` is called (interrupt, caller decision)
//! or when its optional deadline passes. Clones share the same state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

/// Shared, broadcastable cancellation signal for one run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    /// A token that only fires on `cancel()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also fires once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            state: Arc::new(CancelState {
                cancelled: AtomicBool::new(false),
                deadline: Some(deadline),
            }),
        }
    }

    /// A token that fires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Fire the token. Idempotent; calling it after the run finished has no effect on results.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.state.cancelled.load(Ordering::Acquire) {
            return true;
        }
        match self.state.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.state.deadline
    }
}
