//! Fade-in ramp (spec.md §4.5): a newly seen endpoint is selected with
//! probability `((now-t0)/d)^exponent` during `[t0, t0+d]`; applied as a
//! post-filter on every algorithm's selection.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::endpoint::EndpointState;

pub const DEFAULT_EXPONENT: f64 = 1.0;

/// Returns true if the fade-in coin flip says "skip this endpoint and
/// re-select". Endpoints with no configured fade-in window, or past it, are
/// never skipped.
pub fn should_skip(state: &EndpointState, fade_in_duration: Duration, exponent: f64) -> bool {
    if fade_in_duration.is_zero() {
        return false;
    }
    let Some(t0) = state.fade_in_start() else {
        return false;
    };
    let elapsed = Instant::now().saturating_duration_since(t0);
    if elapsed >= fade_in_duration {
        return false;
    }
    let ratio = elapsed.as_secs_f64() / fade_in_duration.as_secs_f64();
    let probability = ratio.powf(exponent);
    rand::rng().random::<f64>() >= probability
}
