//! Process-wide scheduler registry (C7 grouping): maps a queue's group key
//! (a route id for a plain LIFO/FIFO queue, or a user-chosen key for
//! `lifoGroup`/`fifoGroup`) to its active [`Scheduler`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::queue::{Scheduler, SchedulerConfig};

/// On reconfiguration (a new table binds the same key with changed
/// parameters) the old queue is left exactly as-is for its in-flight
/// waiters; [`rebind`](SchedulerRegistry::rebind) installs a fresh queue for
/// future arrivals. The old `Scheduler` is reclaimed once the previous
/// table's compiled routes (its only other referrers) are dropped — an
/// `Arc`-refcount drain, not an explicit close call.
#[derive(Default)]
pub struct SchedulerRegistry {
    queues: Mutex<HashMap<String, Arc<Scheduler>>>,
}

impl SchedulerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to a queue with `config`. The first binder of a key
    /// defines its parameters; later binders with mismatched parameters
    /// keep the existing queue and log a warning (spec.md §4.6).
    pub fn bind(&self, key: &str, config: SchedulerConfig) -> Arc<Scheduler> {
        let mut queues = self.queues.lock().expect("scheduler registry mutex poisoned");
        if let Some(existing) = queues.get(key) {
            if existing.config() != config {
                tracing::warn!(
                    key,
                    "scheduler group already bound with different parameters; keeping first definition"
                );
            }
            return existing.clone();
        }
        let scheduler = Scheduler::new(config);
        queues.insert(key.to_string(), scheduler.clone());
        scheduler
    }

    /// Installs a fresh queue for `key` regardless of what's bound today.
    /// Used when a table build detects changed parameters for a key that's
    /// already bound.
    pub fn rebind(&self, key: &str, config: SchedulerConfig) -> Arc<Scheduler> {
        let mut queues = self.queues.lock().expect("scheduler registry mutex poisoned");
        let scheduler = Scheduler::new(config);
        queues.insert(key.to_string(), scheduler.clone());
        scheduler
    }

    pub fn get(&self, key: &str) -> Option<Arc<Scheduler>> {
        self.queues
            .lock()
            .expect("scheduler registry mutex poisoned")
            .get(key)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::queue::Discipline;
    use std::time::Duration;

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            max_concurrency: 5,
            max_queue_size: 5,
            timeout: Duration::from_secs(1),
            discipline: Discipline::Fifo,
        }
    }

    #[test]
    fn first_bind_wins_on_mismatch() {
        let registry = SchedulerRegistry::new();
        let first = registry.bind("shared", config());
        let mut other = config();
        other.max_concurrency = 10;
        let second = registry.bind("shared", other);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.config().max_concurrency, 5);
    }

    #[test]
    fn rebind_installs_a_fresh_queue() {
        let registry = SchedulerRegistry::new();
        let first = registry.bind("r", config());
        let second = registry.rebind("r", config());
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &registry.get("r").unwrap()));
    }
}
