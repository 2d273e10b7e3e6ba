//! Wires an admission queue into the filter chain (spec.md §4.7 step 4):
//! the request phase waits for a slot, the response phase releases it.

use async_trait::async_trait;
use pingora_http::ResponseHeader;
use pingora_proxy::Session;

use crate::proxy::context::FilterContext;
use crate::route::{Filter, FilterError, FilterSpec, Value};

use super::queue::{Discipline, Scheduler, SchedulerConfig, SchedulerError};
use std::sync::Arc;
use std::time::Duration;

/// A concrete [`Filter`] bound to one [`Scheduler`]. Built by
/// [`SchedulerFilterSpec`] from a route's `lifo(...)`/`fifo(...)` use, or
/// synthesized directly by the routing engine for routes that declare
/// scheduling via their own config rather than an explicit filter use.
pub struct SchedulerFilter {
    scheduler: Arc<Scheduler>,
}

impl SchedulerFilter {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl Filter for SchedulerFilter {
    async fn request(&self, session: &mut Session, ctx: &mut FilterContext) -> pingora::Result<bool> {
        // Status code policy per spec.md §4.6: QueueFull -> 503, QueueTimeout
        // -> 502, Canceled -> 499. Most cancellations never reach this match
        // at all (the whole request future, including this `.await`, is
        // dropped by the caller), but a queue can still observe and report
        // one if it is woken and finds its waiter already gone. The
        // rejection is staged on the context rather than written directly,
        // so the lifecycle can still run the response phase over every
        // filter that ran before this one.
        let _ = session;
        match self.scheduler.wait().await {
            Ok(permit) => {
                ctx.scheduler_permit = Some(permit);
                Ok(false)
            }
            Err(SchedulerError::QueueFull) => {
                ctx.response_status = Some(503);
                Ok(true)
            }
            Err(SchedulerError::QueueTimeout) => {
                ctx.response_status = Some(502);
                Ok(true)
            }
            Err(SchedulerError::Canceled) => {
                ctx.response_status = Some(499);
                Ok(true)
            }
        }
    }

    fn response(
        &self,
        _session: &mut Session,
        _response: &mut ResponseHeader,
        ctx: &mut FilterContext,
    ) -> pingora::Result<()> {
        ctx.scheduler_permit = None;
        Ok(())
    }
}

/// Builds `lifo(maxConcurrency, maxQueueSize, timeoutMs)` and
/// `fifo(maxConcurrency, maxQueueSize, timeoutMs)` filter uses. Both share
/// [`SchedulerFilter`]; only the queueing [`Discipline`] differs.
pub struct SchedulerFilterSpec {
    name: &'static str,
    discipline: Discipline,
    registry: Arc<super::registry::SchedulerRegistry>,
}

impl SchedulerFilterSpec {
    pub fn fifo(registry: Arc<super::registry::SchedulerRegistry>) -> Self {
        Self {
            name: "fifo",
            discipline: Discipline::Fifo,
            registry,
        }
    }

    pub fn lifo(registry: Arc<super::registry::SchedulerRegistry>) -> Self {
        Self {
            name: "lifo",
            discipline: Discipline::Lifo,
            registry,
        }
    }
}

impl FilterSpec for SchedulerFilterSpec {
    fn name(&self) -> &str {
        self.name
    }

    fn create_filter(&self, args: &[Value]) -> Result<Arc<dyn Filter>, FilterError> {
        let [max_concurrency, max_queue_size, timeout_ms, group] = match args {
            [a, b, c] => [a, b, c, &Value::Str(String::new())],
            [a, b, c, d] => [a, b, c, d],
            _ => {
                return Err(FilterError::Arity {
                    name: self.name.to_string(),
                    expected: "3 or 4 arguments (maxConcurrency, maxQueueSize, timeoutMs[, groupKey])",
                    got: args.len(),
                })
            }
        };

        let max_concurrency = max_concurrency.as_i64().ok_or_else(|| FilterError::InvalidArgument {
            name: self.name.to_string(),
            index: 0,
            reason: "expected an integer".to_string(),
        })? as usize;
        let max_queue_size = max_queue_size.as_i64().ok_or_else(|| FilterError::InvalidArgument {
            name: self.name.to_string(),
            index: 1,
            reason: "expected an integer".to_string(),
        })? as usize;
        let timeout_ms = timeout_ms.as_i64().ok_or_else(|| FilterError::InvalidArgument {
            name: self.name.to_string(),
            index: 2,
            reason: "expected an integer".to_string(),
        })?;
        let group_key = match group.as_str() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => format!("{}:{max_concurrency}:{max_queue_size}:{timeout_ms}", self.name),
        };

        let config = SchedulerConfig {
            max_concurrency,
            max_queue_size,
            timeout: Duration::from_millis(timeout_ms.max(0) as u64),
            discipline: self.discipline,
        };
        // A table rebuild that re-resolves this filter use with changed
        // arguments reconfigures the group's queue (spec.md §4.6); one that
        // resolves to the same config just rebinds the existing scheduler.
        let scheduler = match self.registry.get(&group_key) {
            Some(existing) if existing.config() != config => self.registry.rebind(&group_key, config),
            _ => self.registry.bind(&group_key, config),
        };
        Ok(Arc::new(SchedulerFilter::new(scheduler)))
    }
}
