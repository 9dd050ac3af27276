//! Admission gate: at most `capacity` probes in flight.
//!
//! A worker holds a `Permit` for the whole probe; dropping it releases the slot,
//! so release happens on every exit path including panics. Waiting for a slot
//! observes the run's cancellation token.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::control::CancelToken;

/// How often a blocked `acquire` re-checks the cancellation token.
const CANCEL_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct GateState {
    in_use: usize,
    peak: usize,
}

/// Counting gate shared by the dispatcher and its workers.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    state: Mutex<GateState>,
    released: Condvar,
}

/// One admission slot. Released on drop.
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(GateState::default()),
            released: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.lock().in_use
    }

    /// Highest number of slots ever held at once.
    pub fn peak(&self) -> usize {
        self.lock().peak
    }

    /// Take a slot without waiting.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.lock();
        self.take(&mut state)
    }

    /// Wait for a slot. Returns `None` once `cancel` fires, without taking a slot.
    pub fn acquire(&self, cancel: &CancelToken) -> Option<Permit<'_>> {
        let mut state = self.lock();
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            if let Some(permit) = self.take(&mut state) {
                return Some(permit);
            }
            state = self
                .released
                .wait_timeout(state, CANCEL_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn take(&self, state: &mut GateState) -> Option<Permit<'_>> {
        if state.in_use >= self.capacity {
            return None;
        }
        state.in_use += 1;
        state.peak = state.peak.max(state.in_use);
        Some(Permit { gate: self })
    }

    fn release(&self) {
        let mut state = self.lock();
        state.in_use = state.in_use.saturating_sub(1);
        drop(state);
        self.released.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
