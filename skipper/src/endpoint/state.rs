//! Per-endpoint counters and health signals (C5): in-flight count, a sliding
//! success/failure window, last-activity timestamp, fade-in start, and the
//! drop-probability the passive health checker (C9) computes. All fields are
//! updated with atomic operations; no lock is held on the hot path.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

pub struct EndpointState {
    in_flight: AtomicI64,
    window_success: AtomicU64,
    window_failure: AtomicU64,
    last_activity_millis: AtomicU64,
    drop_probability_bits: AtomicU64,
    fade_in_start: OnceLock<Instant>,
    process_start: Instant,
}

/// Result of an upstream call, reported to the registry so the passive
/// health checker can attribute successes/failures per endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NetworkError,
    Http5xx,
    Timeout,
}

impl EndpointState {
    pub fn new(process_start: Instant) -> Self {
        Self {
            in_flight: AtomicI64::new(0),
            window_success: AtomicU64::new(0),
            window_failure: AtomicU64::new(0),
            last_activity_millis: AtomicU64::new(0),
            drop_probability_bits: AtomicU64::new(0f64.to_bits()),
            fade_in_start: OnceLock::new(),
            process_start,
        }
    }

    /// Records the instant this endpoint was first referenced by a table.
    /// A no-op once already set, so repeated table builds don't reset the
    /// fade-in clock.
    pub fn mark_first_seen(&self, now: Instant) {
        let _ = self.fade_in_start.set(now);
    }

    pub fn fade_in_start(&self) -> Option<Instant> {
        self.fade_in_start.get().copied()
    }

    pub fn in_flight(&self) -> i64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Marks one request as in flight against this endpoint; the returned
    /// guard decrements on drop. Takes `self` by `Arc` so the guard can
    /// outlive the call site - it rides along on `FilterContext` for the
    /// life of the request and is dropped once the proxy lifecycle knows
    /// the outcome.
    pub fn acquire(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let millis = Instant::now()
            .duration_since(self.process_start)
            .as_millis() as u64;
        self.last_activity_millis.store(millis, Ordering::Relaxed);
        InFlightGuard {
            state: self.clone(),
        }
    }

    pub fn record(&self, outcome: Outcome) {
        match outcome {
            Outcome::Success => {
                self.window_success.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::NetworkError | Outcome::Http5xx | Outcome::Timeout => {
                self.window_failure.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Drains the sliding window, returning `(successes, failures)` since
    /// the last reset. Called once per configured period by the passive
    /// health checker.
    pub fn reset_window(&self) -> (u64, u64) {
        (
            self.window_success.swap(0, Ordering::Relaxed),
            self.window_failure.swap(0, Ordering::Relaxed),
        )
    }

    pub fn drop_probability(&self) -> f64 {
        f64::from_bits(self.drop_probability_bits.load(Ordering::Relaxed))
    }

    pub fn set_drop_probability(&self, p: f64) {
        self.drop_probability_bits
            .store(p.to_bits(), Ordering::Relaxed);
    }
}

pub struct InFlightGuard {
    state: Arc<EndpointState>,
}

impl InFlightGuard {
    pub fn endpoint_state(&self) -> &Arc<EndpointState> {
        &self.state
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
