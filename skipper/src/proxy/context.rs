//! Per-request state threaded through the proxy lifecycle (C8) and every
//! filter invocation (C2). Lives entirely on the request's own task; never
//! shared across requests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::endpoint::{EndpointRegistry, InFlightGuard};
use crate::engine::table::RoutingTable;
use crate::route::{RouteId, Value};
use crate::scheduler::Permit;

/// The upstream a backend dispatch resolved to, set during the request
/// phase and consumed by `upstream_peer`. Address is `host:port`; pingora
/// resolves it lazily.
#[derive(Debug, Clone)]
pub struct ResolvedPeer {
    pub address: String,
    pub tls: bool,
    pub sni: String,
}

/// A state-bag value a filter stashes for a later filter, or for the
/// lifecycle itself (e.g. the `<dynamic>` backend's target URL).
#[derive(Debug, Clone)]
pub enum StateValue {
    Value(Value),
    Str(String),
}

/// Carries one exchange (request + eventual response) through matching,
/// filters, backend dispatch, and response streaming.
pub struct FilterContext {
    /// The table this request matched against; held so an in-flight
    /// request keeps seeing the route it resolved even if the engine
    /// swaps in a new table mid-flight.
    pub table: Arc<RoutingTable>,

    /// Process-wide endpoint registry, consulted by `LoadBalanced` backend
    /// dispatch (endpoint state, fade-in, drop probability).
    pub endpoint_registry: Arc<EndpointRegistry>,

    /// Id of the route currently driving this exchange. Changes across a
    /// loopback re-entry.
    pub route_id: Option<RouteId>,

    /// Path-template parameters a path predicate captured (e.g. `{id}`).
    pub path_params: HashMap<String, String>,

    /// Free-form per-request scratch space filters use to pass data to
    /// later filters or to the lifecycle (e.g. `<dynamic>`'s target URL).
    pub state: HashMap<String, StateValue>,

    /// Set by a filter (or the lifecycle itself, for `<shunt>`) to mark the
    /// exchange served: the backend dispatch step is skipped.
    pub served: bool,

    /// Host header override for the Network/LoadBalanced backend dispatch,
    /// set by a route's backend configuration or a filter.
    pub outgoing_host: Option<String>,

    /// How many times this exchange has re-entered the matching loop via
    /// `<loopback>`.
    pub loop_count: u32,

    /// The admission-queue permit held for this exchange's scheduler
    /// filter, if its route has one. Dropped (releasing the slot) when the
    /// response phase clears it or the context itself is dropped.
    pub scheduler_permit: Option<Permit>,

    /// The upstream this exchange's backend dispatch resolved to, for
    /// `upstream_peer` to build an `HttpPeer` from. Cleared once consumed.
    pub resolved_peer: Option<ResolvedPeer>,

    /// In-flight guard for the endpoint a `LoadBalanced` dispatch selected,
    /// held for the exchange's lifetime so `logging` can attribute the
    /// upstream outcome to the right `EndpointState` and release the slot.
    /// `None` for routes with a `Network`/`Dynamic`/`Shunt`/`Loopback`
    /// backend - only load-balanced dispatch tracks in-flight count.
    pub in_flight: Option<InFlightGuard>,

    /// Status the upstream actually answered with, captured in
    /// `upstream_response_filter`. Used by `logging` to tell a plain 5xx
    /// response apart from a connection-level failure.
    pub upstream_status: Option<u16>,

    /// Status a filter (e.g. `status(...)`) chose for a `<shunt>` or
    /// no-match response. Falls back to the configured default status.
    pub response_status: Option<u16>,

    /// Whether the request phase decided this exchange is a protocol
    /// upgrade worth preserving hop-by-hop headers for (`experimental_
    /// upgrade` and an `Upgrade` request). Consulted again in the response
    /// phase so a `101` keeps the same headers the handshake needs.
    pub preserve_upgrade: bool,

    /// Body a filter (e.g. `inlineContent(...)`) chose for a `<shunt>`
    /// response. Falls back to an empty body.
    pub response_body: Option<bytes::Bytes>,

    /// Wall-clock start, for the access-log/latency metric emitted at the
    /// end of the lifecycle.
    pub started_at: Instant,
}

impl FilterContext {
    pub fn new(table: Arc<RoutingTable>, endpoint_registry: Arc<EndpointRegistry>) -> Self {
        Self {
            table,
            endpoint_registry,
            route_id: None,
            path_params: HashMap::new(),
            state: HashMap::new(),
            served: false,
            outgoing_host: None,
            loop_count: 0,
            scheduler_permit: None,
            resolved_peer: None,
            in_flight: None,
            upstream_status: None,
            response_status: None,
            preserve_upgrade: false,
            response_body: None,
            started_at: Instant::now(),
        }
    }

    pub fn set_state(&mut self, key: impl Into<String>, value: StateValue) {
        self.state.insert(key.into(), value);
    }

    pub fn get_state(&self, key: &str) -> Option<&StateValue> {
        self.state.get(key)
    }
}
