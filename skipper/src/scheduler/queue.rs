//! A single route's (or group's) admission queue (C7): bounded concurrency
//! plus a bounded FIFO or LIFO wait queue.
//!
//! The wait queue itself is guarded by a plain `std::sync::Mutex` rather
//! than an async one — spec.md §5's shared-resource policy calls this out
//! explicitly ("each queue has an internal mutex/condition; hot path is
//! short"), so a blocking lock held only across a `VecDeque` push/pop is the
//! right tool, not extra async machinery.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    Fifo,
    Lifo,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub max_concurrency: usize,
    pub max_queue_size: usize,
    pub timeout: Duration,
    pub discipline: Discipline,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("admission queue is full")]
    QueueFull,
    #[error("admission queue wait timed out")]
    QueueTimeout,
    /// The caller gave up while queued (e.g. the client disconnected)
    /// rather than the queue itself timing out or rejecting.
    #[error("admission queue wait was canceled")]
    Canceled,
}

pub struct Scheduler {
    config: SchedulerConfig,
    in_flight: AtomicUsize,
    queue: Mutex<VecDeque<Arc<Notify>>>,
    queued_len: AtomicUsize,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            in_flight: AtomicUsize::new(0),
            queue: Mutex::new(VecDeque::new()),
            queued_len: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn queue_depth(&self) -> usize {
        self.queued_len.load(Ordering::Relaxed)
    }

    fn try_acquire_slot(&self) -> bool {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < self.config.max_concurrency).then_some(current + 1)
            })
            .is_ok()
    }

    /// Admits the caller, queueing if the route is already at
    /// `MaxConcurrency`. On success the caller holds one concurrency slot
    /// until the returned [`Permit`] is dropped.
    pub async fn wait(self: &Arc<Self>) -> Result<Permit, SchedulerError> {
        if self.try_acquire_slot() {
            return Ok(Permit {
                scheduler: self.clone(),
            });
        }

        let notify = Arc::new(Notify::new());
        {
            let mut queue = self.queue.lock().expect("scheduler queue mutex poisoned");
            if queue.len() >= self.config.max_queue_size {
                return Err(SchedulerError::QueueFull);
            }
            match self.config.discipline {
                Discipline::Fifo => queue.push_back(notify.clone()),
                Discipline::Lifo => queue.push_front(notify.clone()),
            }
        }
        self.queued_len.fetch_add(1, Ordering::Relaxed);

        // Guarantees the queue entry is removed and `queued_len` adjusted
        // exactly once no matter how this future exits: a normal wakeup
        // from `release`, a timeout, or the future being dropped while
        // still parked here (e.g. the client disconnected).
        let mut waiter = QueuedWaiter {
            scheduler: self.as_ref(),
            notify: notify.clone(),
            settled: false,
        };

        match timeout(self.config.timeout, notify.notified()).await {
            Ok(()) => {
                waiter.settled = true;
                Ok(Permit {
                    scheduler: self.clone(),
                })
            }
            Err(_) => Err(SchedulerError::QueueTimeout),
        }
    }

    fn remove_waiter(&self, notify: &Arc<Notify>) {
        let mut queue = self.queue.lock().expect("scheduler queue mutex poisoned");
        queue.retain(|n| !Arc::ptr_eq(n, notify));
    }

    fn release(&self) {
        let mut queue = self.queue.lock().expect("scheduler queue mutex poisoned");
        match queue.pop_front() {
            Some(next) => {
                drop(queue);
                self.queued_len.fetch_sub(1, Ordering::Relaxed);
                // Hand the freed slot straight to the woken waiter;
                // in_flight never counted queued waiters so it stays put.
                next.notify_one();
            }
            None => {
                drop(queue);
                self.in_flight.fetch_sub(1, Ordering::Release);
            }
        }
    }
}

/// Owns one entry in the wait queue for the lifetime of a `wait()` call.
/// `release()` removes an entry itself on a normal wakeup, in which case
/// `settled` is set so `Drop` is a no-op; otherwise (timeout, or the
/// `wait()` future dropped mid-await on cancellation) `Drop` removes the
/// entry and decrements `queued_len`, so a canceled waiter can never be
/// handed a slot nobody collects.
struct QueuedWaiter<'a> {
    scheduler: &'a Scheduler,
    notify: Arc<Notify>,
    settled: bool,
}

impl Drop for QueuedWaiter<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.scheduler.remove_waiter(&self.notify);
        self.scheduler.queued_len.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Holds one concurrency slot; releases it (to the next queued waiter, or
/// back to the pool) on drop.
pub struct Permit {
    scheduler: Arc<Scheduler>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.scheduler.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_concurrency: usize, max_queue_size: usize, discipline: Discipline) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrency,
            max_queue_size,
            timeout: Duration::from_millis(50),
            discipline,
        }
    }

    #[tokio::test]
    async fn admits_up_to_max_concurrency() {
        let scheduler = Scheduler::new(config(2, 0, Discipline::Fifo));
        let a = scheduler.wait().await.unwrap();
        let b = scheduler.wait().await.unwrap();
        assert_eq!(scheduler.in_flight(), 2);
        drop(a);
        drop(b);
    }

    #[tokio::test]
    async fn zero_queue_fails_full_immediately() {
        let scheduler = Scheduler::new(config(1, 0, Discipline::Fifo));
        let _permit = scheduler.wait().await.unwrap();
        let second = scheduler.wait().await;
        assert_eq!(second.unwrap_err(), SchedulerError::QueueFull);
    }

    #[tokio::test]
    async fn queued_waiter_times_out() {
        let scheduler = Scheduler::new(config(1, 1, Discipline::Fifo));
        let _permit = scheduler.wait().await.unwrap();
        let second = scheduler.wait().await;
        assert_eq!(second.unwrap_err(), SchedulerError::QueueTimeout);
    }

    #[tokio::test]
    async fn release_hands_slot_to_queued_waiter() {
        let scheduler = Scheduler::new(SchedulerConfig {
            max_concurrency: 1,
            max_queue_size: 1,
            timeout: Duration::from_secs(5),
            discipline: Discipline::Fifo,
        });
        let first = scheduler.wait().await.unwrap();

        let waiter_scheduler = scheduler.clone();
        let waiter = tokio::spawn(async move { waiter_scheduler.wait().await });

        tokio::task::yield_now().await;
        drop(first);

        let permit = waiter.await.unwrap().unwrap();
        assert_eq!(scheduler.in_flight(), 1);
        drop(permit);
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[tokio::test]
    async fn dropping_a_queued_waiter_does_not_leak_a_slot() {
        let scheduler = Scheduler::new(SchedulerConfig {
            max_concurrency: 1,
            max_queue_size: 1,
            timeout: Duration::from_secs(5),
            discipline: Discipline::Fifo,
        });
        let first = scheduler.wait().await.unwrap();

        let waiter_scheduler = scheduler.clone();
        let waiter = tokio::spawn(async move { waiter_scheduler.wait().await });
        tokio::task::yield_now().await;
        assert_eq!(scheduler.queue_depth(), 1);

        // The caller gives up on the queued waiter before it is ever woken.
        waiter.abort();
        let _ = waiter.await;
        assert_eq!(scheduler.queue_depth(), 0);

        // Releasing the original permit must not hand the slot to the
        // now-gone waiter; a fresh caller should be able to claim it.
        drop(first);
        let second = scheduler.wait().await.unwrap();
        assert_eq!(scheduler.in_flight(), 1);
        drop(second);
    }
}
