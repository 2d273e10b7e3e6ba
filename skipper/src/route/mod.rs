//! The route model (C1): parsed predicates, filters, and a backend spec per
//! route, plus the C2 name -> spec registries.
//!
//! A compiled route is immutable once published (see [`crate::engine`]);
//! replacement always happens by whole-table swap, never in-place mutation.

pub mod backend;
pub mod filter;
pub mod predicate;
pub mod registry;
pub mod value;

use std::sync::Arc;
use std::time::Duration;

pub use backend::{Backend, EndpointDescriptor, EndpointScheme, LoadBalancedBackend};
pub use filter::{Filter, FilterError, FilterSpec};
pub use predicate::{
    Facet, HostSpecificity, PathHint, PathSpecificity, Predicate, PredicateError, PredicateSpec,
    RequestInfo,
};
pub use registry::{FilterRegistry, PredicateRegistry};
pub use value::Value;

/// A route's stable identity. Cheap to clone and compare; routes are keyed
/// by this across data sources.
pub type RouteId = Arc<str>;

/// An uncompiled route as read from a [`crate::engine::DataClient`]:
/// predicate and filter *names and arguments*, not yet resolved against a
/// registry.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub id: RouteId,
    pub predicates: Vec<PredicateUse>,
    pub filters: Vec<FilterUse>,
    pub backend: BackendSpec,
}

#[derive(Debug, Clone)]
pub struct PredicateUse {
    pub name: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct FilterUse {
    pub name: String,
    pub args: Vec<Value>,
}

/// Uncompiled backend descriptor, as carried on a [`RouteSpec`] before
/// compilation resolves endpoints into the shared endpoint registry and
/// binds a concrete [`crate::balancer::LoadBalancer`].
#[derive(Debug, Clone)]
pub enum BackendSpec {
    Network(http::Uri),
    Shunt,
    Loopback,
    Dynamic,
    LoadBalanced {
        algorithm: crate::balancer::Algorithm,
        endpoints: Vec<EndpointDescriptor>,
        /// Fade-in window (spec.md §4.5); `Duration::ZERO` disables fade-in.
        fade_in_duration: Duration,
        fade_in_exponent: f64,
    },
}

/// A predicate attached to a compiled route, with its instance and the
/// weight it contributes to the matching-tree tie-break order.
pub struct PredicateInstance {
    pub name: String,
    pub weight: i32,
    pub predicate: Box<dyn Predicate>,
}

/// A filter attached to a compiled route, in declaration order.
#[derive(Clone)]
pub struct FilterInstance {
    pub name: String,
    pub filter: Arc<dyn Filter>,
}

/// A route once predicates and filters have been resolved against the
/// registries and the backend has been bound to concrete endpoints. Routes
/// are immutable after this point; a table swap is always whole-table.
pub struct CompiledRoute {
    pub id: RouteId,
    pub predicates: Vec<PredicateInstance>,
    pub filters: Vec<FilterInstance>,
    pub backend: Backend,
}

impl CompiledRoute {
    /// Sum of this route's predicate weights; the matching tree's first
    /// tie-break criterion.
    pub fn cumulative_weight(&self) -> i64 {
        self.predicates.iter().map(|p| p.weight as i64).sum()
    }

    pub fn matches(&self, req: &RequestInfo<'_>) -> bool {
        self.predicates.iter().all(|p| p.predicate.matches(req))
    }
}

impl std::fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("id", &self.id)
            .field("predicates", &self.predicates.len())
            .field("filters", &self.filters.len())
            .field("backend", &self.backend)
            .finish()
    }
}
