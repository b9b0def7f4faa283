//! Run-scoped circuit breaker.
//!
//! Starts closed; the first systemic failure opens it for the rest of the
//! run. There is no half-open state. A new pipeline run gets a new breaker.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::FetchError;

// ---

#[derive(Debug, Default)]
pub struct CircuitBreaker {
    open: AtomicBool,
}

impl CircuitBreaker {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Open the breaker. Returns `true` only for the call that flipped it.
    pub fn trip(&self) -> bool {
        !self.open.swap(true, Ordering::AcqRel)
    }

    /// Feed a fetch failure in; trips on `Unauthorized` and `Unexpected`.
    /// Returns `true` if this error is the one that opened the breaker.
    pub fn record(&self, err: &FetchError) -> bool {
        // ---
        if err.trips_breaker() {
            self.trip()
        } else {
            false
        }
    }
}
