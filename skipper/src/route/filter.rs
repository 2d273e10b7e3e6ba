//! Filter contract: name -> spec lookup (C2) and the two-phase execution
//! capability the proxy lifecycle (C8) drives.

use async_trait::async_trait;
use pingora_http::ResponseHeader;
use pingora_proxy::Session;
use thiserror::Error;

use crate::proxy::context::FilterContext;
use crate::route::value::Value;

/// A two-phase request/response mutator, composable into chains.
///
/// The same instance runs both phases of one exchange, and is shared across
/// concurrent requests for other exchanges — any internal mutable state
/// must synchronize itself. Prefer storing per-request data on
/// [`FilterContext`]'s state bag instead.
///
/// `request` is async (it may need to wait - e.g. on a scheduler queue);
/// `response` is plain `fn`, matching the pingora hook it runs from
/// (response-header rewriting happens synchronously, same as the teacher's
/// `upstream_response_filter`).
#[async_trait]
pub trait Filter: Send + Sync {
    /// Request-phase hook, called in declaration order. Returning `Ok(true)`
    /// marks the exchange served: the remaining request-phase filters and
    /// the backend dispatch are skipped.
    async fn request(
        &self,
        _session: &mut Session,
        _ctx: &mut FilterContext,
    ) -> pingora::Result<bool> {
        Ok(false)
    }

    /// Response-phase hook, called in reverse declaration order.
    fn response(
        &self,
        _session: &mut Session,
        _response: &mut ResponseHeader,
        _ctx: &mut FilterContext,
    ) -> pingora::Result<()> {
        Ok(())
    }
}

/// A filter blueprint, registered once at process init and consulted at
/// table-build time.
pub trait FilterSpec: Send + Sync {
    fn name(&self) -> &str;
    fn create_filter(&self, args: &[Value]) -> Result<std::sync::Arc<dyn Filter>, FilterError>;
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter {name:?} expects {expected}, got {got} argument(s)")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("filter {name:?} argument {index}: {reason}")]
    InvalidArgument {
        name: String,
        index: usize,
        reason: String,
    },
}
