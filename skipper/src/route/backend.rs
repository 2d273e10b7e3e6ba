//! Compiled backend descriptor: the terminal of a route, resolved at
//! compile time (network URL, shunt, loopback, dynamic, or a load-balanced
//! endpoint pool).

use std::sync::Arc;

use crate::balancer::LoadBalancer;

/// `(scheme, host, port)` identity of an upstream endpoint, shared between a
/// route's [`Backend::LoadBalanced`] pool and the process-wide endpoint
/// registry (C5).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointDescriptor {
    pub scheme: EndpointScheme,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointScheme {
    Http,
    Https,
}

impl std::fmt::Display for EndpointScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointScheme::Http => write!(f, "http"),
            EndpointScheme::Https => write!(f, "https"),
        }
    }
}

impl EndpointDescriptor {
    pub fn to_uri(&self) -> http::Uri {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
            .parse()
            .expect("scheme+host+port always form a valid authority URI")
    }
}

impl std::fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// The terminal of a route (spec's "Backend descriptor"), resolved at
/// compile time.
#[derive(Clone)]
pub enum Backend {
    /// Absolute upstream URL; path/query come from the incoming request
    /// unless a filter overrides them.
    Network(http::Uri),

    /// No upstream: a filter must produce the response, or the configured
    /// default status is synthesized.
    Shunt,

    /// Re-match the (possibly filter-mutated) request against the same
    /// table. Counted against `MaxLoopbacks`.
    Loopback,

    /// The request's state bag carries a per-request URL chosen by a filter
    /// at runtime; treated as [`Backend::Network`] once resolved.
    Dynamic,

    /// An algorithm plus its endpoint pool.
    LoadBalanced(Arc<LoadBalancedBackend>),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Network(uri) => write!(f, "Network({uri})"),
            Backend::Shunt => write!(f, "Shunt"),
            Backend::Loopback => write!(f, "Loopback"),
            Backend::Dynamic => write!(f, "Dynamic"),
            Backend::LoadBalanced(lb) => {
                write!(f, "LoadBalanced({} endpoints)", lb.endpoints.len())
            }
        }
    }
}

pub struct LoadBalancedBackend {
    pub endpoints: Vec<EndpointDescriptor>,
    pub balancer: LoadBalancer,
}
