//! Passive health checking (C9, spec.md §4.9): no active probes, just a
//! periodic read of each endpoint's sliding-window success/failure counts,
//! converted into a drop probability fed back into load balancing.

use std::sync::Arc;
use std::time::Duration;

use crate::endpoint::EndpointRegistry;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassiveHealthConfig {
    pub period: Duration,
    pub min_requests: u32,
    pub failure_rate_threshold: f64,
    pub scale: f64,
    pub min_drop_probability: f64,
    pub max_drop_probability: f64,
}

/// Computes the drop probability for one endpoint's window, per spec.md
/// §4.9: `p = clamp((failure_rate - threshold) * scale, p_min, p_max)`.
/// An endpoint with fewer than `min_requests` samples this period is left
/// alone (not enough signal either way).
pub fn drop_probability(
    config: &PassiveHealthConfig,
    successes: u64,
    failures: u64,
) -> Option<f64> {
    let total = successes + failures;
    if total < config.min_requests as u64 {
        return None;
    }
    let failure_rate = failures as f64 / total as f64;
    let raw = (failure_rate - config.failure_rate_threshold) * config.scale;
    Some(raw.clamp(config.min_drop_probability, config.max_drop_probability))
}

/// Runs the passive health check loop: every `config.period`, sweeps the
/// registry's endpoints, recomputes each one's drop probability from its
/// sliding window, and resets the window for the next period.
///
/// Intended to be driven by a single `tokio::spawn`'d task for the
/// process's lifetime (see `app_context`); it never returns on its own.
pub async fn run(registry: Arc<EndpointRegistry>, config: PassiveHealthConfig) {
    let mut ticker = tokio::time::interval(config.period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        tick(&registry, &config);
    }
}

fn tick(registry: &EndpointRegistry, config: &PassiveHealthConfig) {
    for state in registry.snapshot() {
        let (successes, failures) = state.reset_window();
        if let Some(p) = drop_probability(config, successes, failures) {
            state.set_drop_probability(p);
            if p > 0.0 {
                tracing::debug!(
                    successes,
                    failures,
                    drop_probability = p,
                    "passive health check updated drop probability"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PassiveHealthConfig {
        PassiveHealthConfig {
            period: Duration::from_secs(10),
            min_requests: 10,
            failure_rate_threshold: 0.1,
            scale: 2.0,
            min_drop_probability: 0.0,
            max_drop_probability: 0.95,
        }
    }

    #[test]
    fn below_min_requests_is_left_alone() {
        assert_eq!(drop_probability(&config(), 2, 1), None);
    }

    #[test]
    fn below_threshold_drops_to_zero() {
        let p = drop_probability(&config(), 95, 5).unwrap();
        assert_eq!(p, 0.0);
    }

    #[test]
    fn above_threshold_scales_and_clamps() {
        let p = drop_probability(&config(), 50, 50).unwrap();
        assert!((p - 0.8).abs() < 1e-9);

        let p_max = drop_probability(&config(), 0, 100).unwrap();
        assert_eq!(p_max, 0.95);
    }
}
