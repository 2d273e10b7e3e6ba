//! Stateless selection algorithms (spec.md §4.5). Each returns an index into
//! the caller's endpoint slice.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use crate::endpoint::EndpointRegistry;
use crate::route::EndpointDescriptor;

use super::SelectionKey;

pub fn round_robin(counter: &AtomicUsize, len: usize) -> usize {
    counter.fetch_add(1, Ordering::Relaxed) % len
}

pub fn random(len: usize) -> usize {
    rand::rng().random_range(0..len)
}

/// Rendezvous (highest-random-weight) hashing: adding or removing one
/// endpoint disturbs at most 1/N of the mappings, the same guarantee a ring
/// gives, without maintaining one.
pub fn consistent_hash(endpoints: &[EndpointDescriptor], key: &SelectionKey<'_>) -> usize {
    let mut key_hasher = std::collections::hash_map::DefaultHasher::new();
    match key.client_addr {
        Some(addr) => addr.hash(&mut key_hasher),
        None => key.path.hash(&mut key_hasher),
    }
    let key_hash = key_hasher.finish();

    endpoints
        .iter()
        .enumerate()
        .max_by_key(|(_, endpoint)| {
            let mut weight_hasher = std::collections::hash_map::DefaultHasher::new();
            key_hash.hash(&mut weight_hasher);
            endpoint.to_string().hash(&mut weight_hasher);
            weight_hasher.finish()
        })
        .map(|(index, _)| index)
        .unwrap_or(0)
}

/// Sample `k` endpoints uniformly, pick the one with the lower in-flight
/// count; ties broken by lower drop-probability.
pub fn power_of_n_choices(
    endpoints: &[EndpointDescriptor],
    registry: &EndpointRegistry,
    k: usize,
) -> usize {
    let k = k.clamp(1, endpoints.len());
    let mut rng = rand::rng();
    let mut best: Option<(usize, i64, f64)> = None;

    for _ in 0..k {
        let index = rng.random_range(0..endpoints.len());
        let state = registry.get_or_create(&endpoints[index]);
        let candidate = (index, state.in_flight(), state.drop_probability());
        best = Some(match best {
            None => candidate,
            Some(current) => {
                if candidate.1 < current.1 || (candidate.1 == current.1 && candidate.2 < current.2)
                {
                    candidate
                } else {
                    current
                }
            }
        });
    }

    best.map(|(index, ..)| index).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_cycles() {
        let counter = AtomicUsize::new(0);
        let picks: Vec<usize> = (0..5).map(|_| round_robin(&counter, 3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn consistent_hash_is_stable_for_same_key() {
        let endpoints = vec![
            EndpointDescriptor {
                scheme: crate::route::EndpointScheme::Http,
                host: "a.test".into(),
                port: 80,
            },
            EndpointDescriptor {
                scheme: crate::route::EndpointScheme::Http,
                host: "b.test".into(),
                port: 80,
            },
        ];
        let key = SelectionKey {
            client_addr: Some("10.0.0.1".parse().unwrap()),
            path: "/x",
        };
        let first = consistent_hash(&endpoints, &key);
        let second = consistent_hash(&endpoints, &key);
        assert_eq!(first, second);
    }
}
