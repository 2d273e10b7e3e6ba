//! Admission queues (C7): per-route or per-group bounded concurrency plus a
//! bounded FIFO/LIFO wait queue, giving routes backpressure instead of
//! unbounded fan-out into the upstream dispatch.

pub mod filter;
pub mod queue;
pub mod registry;

pub use filter::{SchedulerFilter, SchedulerFilterSpec};
pub use queue::{Discipline, Permit, Scheduler, SchedulerConfig, SchedulerError};
pub use registry::SchedulerRegistry;
