//! Load-balancing algorithms (C6): one endpoint selected per request from a
//! route's endpoint list, followed by the fade-in and drop-probability
//! post-filters (spec.md §4.5).

pub mod algorithms;
pub mod fade_in;

use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use rand::Rng;

use crate::endpoint::EndpointRegistry;
use crate::route::EndpointDescriptor;

/// The algorithm tag carried on a route's `LoadBalanced` backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    RoundRobin,
    Random,
    ConsistentHash,
    PowerOfNChoices { k: usize },
}

/// What a selection needs to know about the request; only consulted by
/// [`Algorithm::ConsistentHash`].
pub struct SelectionKey<'a> {
    pub client_addr: Option<std::net::IpAddr>,
    pub path: &'a str,
}

/// Bound, per-route selector: an [`Algorithm`] plus whatever state it needs
/// (a counter for round robin) and this route's fade-in configuration.
pub struct LoadBalancer {
    algorithm: Algorithm,
    round_robin: AtomicUsize,
    fade_in_duration: Duration,
    fade_in_exponent: f64,
}

impl LoadBalancer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            round_robin: AtomicUsize::new(0),
            fade_in_duration: Duration::ZERO,
            fade_in_exponent: fade_in::DEFAULT_EXPONENT,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn with_fade_in(mut self, duration: Duration, exponent: f64) -> Self {
        self.fade_in_duration = duration;
        self.fade_in_exponent = exponent;
        self
    }

    /// Selects one endpoint from `endpoints`, applying the fade-in and
    /// drop-probability post-filters. `endpoints` must be non-empty — a
    /// `LoadBalanced` route always has at least one (enforced at compile
    /// time).
    pub fn select(
        &self,
        endpoints: &[EndpointDescriptor],
        registry: &EndpointRegistry,
        key: &SelectionKey<'_>,
    ) -> usize {
        let retries = endpoints.len().min(3);
        let mut chosen = self.raw_select(endpoints, registry, key);

        for _ in 0..retries {
            let state = registry.get_or_create(&endpoints[chosen]);
            let skip = fade_in::should_skip(&state, self.fade_in_duration, self.fade_in_exponent)
                || drop_selection(&state);
            if !skip {
                return chosen;
            }
            chosen = self.raw_select(endpoints, registry, key);
        }
        chosen
    }

    fn raw_select(
        &self,
        endpoints: &[EndpointDescriptor],
        registry: &EndpointRegistry,
        key: &SelectionKey<'_>,
    ) -> usize {
        match self.algorithm {
            Algorithm::RoundRobin => algorithms::round_robin(&self.round_robin, endpoints.len()),
            Algorithm::Random => algorithms::random(endpoints.len()),
            Algorithm::ConsistentHash => algorithms::consistent_hash(endpoints, key),
            Algorithm::PowerOfNChoices { k } => {
                algorithms::power_of_n_choices(endpoints, registry, k)
            }
        }
    }
}

fn drop_selection(state: &crate::endpoint::EndpointState) -> bool {
    let p = state.drop_probability();
    if p <= 0.0 {
        return false;
    }
    rand::rng().random::<f64>() < p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::EndpointScheme;

    fn endpoints() -> Vec<EndpointDescriptor> {
        (0..4)
            .map(|i| EndpointDescriptor {
                scheme: EndpointScheme::Http,
                host: format!("e{i}.test"),
                port: 80,
            })
            .collect()
    }

    #[test]
    fn round_robin_selection_picks_in_range() {
        let balancer = LoadBalancer::new(Algorithm::RoundRobin);
        let registry = EndpointRegistry::new(3);
        let eps = endpoints();
        let key = SelectionKey {
            client_addr: None,
            path: "/",
        };
        for _ in 0..10 {
            let idx = balancer.select(&eps, &registry, &key);
            assert!(idx < eps.len());
        }
    }

    #[test]
    fn drop_probability_one_still_terminates_via_bounded_retries() {
        let balancer = LoadBalancer::new(Algorithm::RoundRobin);
        let registry = EndpointRegistry::new(3);
        let eps = endpoints();
        for ep in &eps {
            registry.get_or_create(ep).set_drop_probability(1.0);
        }
        let key = SelectionKey {
            client_addr: None,
            path: "/",
        };
        // Every endpoint is dropped; selection must still return a usable
        // index after bounded retries rather than looping forever.
        let idx = balancer.select(&eps, &registry, &key);
        assert!(idx < eps.len());
    }
}
