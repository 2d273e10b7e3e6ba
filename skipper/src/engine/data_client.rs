//! The `DataClient` contract (spec.md §6): the core's only view of where
//! routes come from. Concrete clients (Kubernetes, etcd, ...) are external
//! collaborators; only minimal reference clients live in this crate (see
//! `sources`).

use async_trait::async_trait;
use thiserror::Error;

use crate::route::RouteSpec;

#[derive(Debug, Error)]
pub enum DataClientError {
    #[error("data source {source}: {reason}")]
    Transient { source: String, reason: String },
}

/// One upstream source of routes. The engine (C4) polls `load_update` at a
/// configured interval and applies the delta to that source's private
/// `Id -> Route` map; `load_all` seeds it.
#[async_trait]
pub trait DataClient: Send + Sync {
    /// A stable name, used for logging and as the tie-break key in the
    /// engine's fixed source-priority order.
    fn name(&self) -> &str;

    /// Initial snapshot. Called once, before the first table build.
    async fn load_all(&self) -> Result<Vec<RouteSpec>, DataClientError>;

    /// Incremental delta since the last call. Returns `(upserts, deletes)`.
    /// A transient error leaves the source's prior view unchanged (spec.md
    /// §4.3 failure semantics) rather than failing the whole engine.
    async fn load_update(&self) -> Result<(Vec<RouteSpec>, Vec<String>), DataClientError>;

    /// Releases any resources (file watches, connections) this client holds.
    async fn close(&self);
}
