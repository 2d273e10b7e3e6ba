//! Process-wide endpoint registry (C5): a map from `(scheme,host,port)` to
//! endpoint state, shared across every `LoadBalanced` route that references
//! the endpoint. Built on `concread`'s concurrent map so readers never block
//! writers and vice versa.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use concread::hashmap::HashMap as ConcHashMap;

use crate::route::EndpointDescriptor;

use super::state::EndpointState;

pub struct EndpointRegistry {
    entries: ConcHashMap<EndpointDescriptor, Arc<EndpointState>>,
    absence: ConcHashMap<EndpointDescriptor, u32>,
    process_start: Instant,
    gc_after: u32,
}

impl EndpointRegistry {
    /// `gc_after` is how many consecutive table builds an endpoint may be
    /// absent from before its state is evicted (spec.md §4.4 lifecycle).
    pub fn new(gc_after: u32) -> Self {
        Self {
            entries: ConcHashMap::new(),
            absence: ConcHashMap::new(),
            process_start: Instant::now(),
            gc_after,
        }
    }

    /// Returns the existing state for `endpoint`, or creates and registers
    /// one. Table compilation calls this for every endpoint a route
    /// references so counters survive across table swaps.
    pub fn get_or_create(&self, endpoint: &EndpointDescriptor) -> Arc<EndpointState> {
        if let Some(state) = self.get(endpoint) {
            return state;
        }

        let mut write = self.entries.write();
        if let Some(state) = write.get(endpoint) {
            let state = state.clone();
            write.commit();
            return state;
        }
        let state = Arc::new(EndpointState::new(self.process_start));
        state.mark_first_seen(Instant::now());
        write.insert(endpoint.clone(), state.clone());
        write.commit();
        state
    }

    pub fn get(&self, endpoint: &EndpointDescriptor) -> Option<Arc<EndpointState>> {
        self.entries.read().get(endpoint).cloned()
    }

    /// All currently-registered endpoint states, for the passive health
    /// checker's periodic sweep.
    pub fn snapshot(&self) -> Vec<Arc<EndpointState>> {
        self.entries.read().iter().map(|(_, v)| v.clone()).collect()
    }

    /// Same as [`Self::snapshot`], paired with each endpoint's identity -
    /// the admin metrics surface renders these per endpoint.
    pub fn snapshot_with_descriptor(&self) -> Vec<(EndpointDescriptor, Arc<EndpointState>)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Called once per table publication with the set of endpoints the new
    /// table still references; bumps the absence counter for everything
    /// else and evicts entries absent for `gc_after` consecutive builds.
    pub fn sweep(&self, live: &HashSet<EndpointDescriptor>) {
        let known: Vec<EndpointDescriptor> = {
            let read = self.entries.read();
            read.iter().map(|(key, _)| key.clone()).collect()
        };

        let mut absence = self.absence.write();
        let mut entries = self.entries.write();
        for key in known {
            if live.contains(&key) {
                absence.remove(&key);
                continue;
            }
            let count = absence.get(&key).copied().unwrap_or(0) + 1;
            if count >= self.gc_after {
                entries.remove(&key);
                absence.remove(&key);
            } else {
                absence.insert(key, count);
            }
        }
        absence.commit();
        entries.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::EndpointScheme;

    fn ep(host: &str) -> EndpointDescriptor {
        EndpointDescriptor {
            scheme: EndpointScheme::Http,
            host: host.to_string(),
            port: 80,
        }
    }

    #[test]
    fn get_or_create_is_stable() {
        let registry = EndpointRegistry::new(3);
        let a = registry.get_or_create(&ep("a.test"));
        let b = registry.get_or_create(&ep("a.test"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn sweep_evicts_after_gc_after_absences() {
        let registry = EndpointRegistry::new(2);
        registry.get_or_create(&ep("a.test"));

        let empty = HashSet::new();
        registry.sweep(&empty);
        assert!(registry.get(&ep("a.test")).is_some());

        registry.sweep(&empty);
        assert!(registry.get(&ep("a.test")).is_none());
    }

    #[test]
    fn sweep_keeps_live_endpoints() {
        let registry = EndpointRegistry::new(1);
        let target = ep("a.test");
        registry.get_or_create(&target);

        let mut live = HashSet::new();
        live.insert(target.clone());
        registry.sweep(&live);
        registry.sweep(&live);
        assert!(registry.get(&target).is_some());
    }
}
