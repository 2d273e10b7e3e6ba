//! The admin/observability surface (spec.md §6): the current route table as
//! text, a single route by id, a metrics snapshot, and liveness/readiness -
//! the core exposes these, a shell binds them to a port. No metrics
//! exporter sink is implemented (spec.md Non-goals); the snapshot here is
//! a plain JSON dump of the counters `skipper::endpoint` already tracks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::endpoint::EndpointRegistry;
use crate::engine::RoutingEngine;
use crate::engine::table::RoutingTable;
use crate::route::{Backend, CompiledRoute};

struct AdminState {
    engine: Arc<RoutingEngine>,
    endpoint_registry: Arc<EndpointRegistry>,
    started_at: Instant,
}

/// Builds the admin router, plus the readiness flag the bootstrap task
/// flips (via [`ReadyFlag::mark_ready`]) once the engine's first table
/// publication completes (after `RoutingEngine::wait_for_first_load`).
pub fn router(engine: Arc<RoutingEngine>, endpoint_registry: Arc<EndpointRegistry>) -> (Router, Arc<ReadyFlag>) {
    let ready = Arc::new(ReadyFlag(AtomicBool::new(false)));
    let state = Arc::new(AdminState {
        engine,
        endpoint_registry,
        started_at: Instant::now(),
    });
    let router = Router::new()
        .route("/routes", get(list_routes))
        .route("/routes/{id}", get(get_route))
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state((state, ready.clone()));
    (router, ready)
}

/// Shared flip-once readiness signal, set by the caller once the routing
/// engine has published its first table.
pub struct ReadyFlag(AtomicBool);

impl ReadyFlag {
    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

type SharedState = (Arc<AdminState>, Arc<ReadyFlag>);

async fn list_routes(State((state, _)): State<SharedState>) -> Response {
    let table = state.engine.table();
    (StatusCode::OK, render_table(&table)).into_response()
}

async fn get_route(State((state, _)): State<SharedState>, Path(id): Path<String>) -> Response {
    let table = state.engine.table();
    match table.routes().iter().find(|r| r.id.as_ref() == id.as_str()) {
        Some(route) => (StatusCode::OK, render_route(route)).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no route with id {id:?}\n")).into_response(),
    }
}

#[derive(Serialize)]
struct MetricsSnapshot {
    uptime_seconds: u64,
    route_count: usize,
    endpoints: Vec<EndpointMetrics>,
}

#[derive(Serialize)]
struct EndpointMetrics {
    endpoint: String,
    in_flight: i64,
    drop_probability: f64,
}

async fn metrics(State((state, _)): State<SharedState>) -> Json<MetricsSnapshot> {
    let table = state.engine.table();
    let endpoints = state
        .endpoint_registry
        .snapshot_with_descriptor()
        .into_iter()
        .map(|(descriptor, metrics)| EndpointMetrics {
            endpoint: descriptor.to_string(),
            in_flight: metrics.in_flight(),
            drop_probability: metrics.drop_probability(),
        })
        .collect();

    Json(MetricsSnapshot {
        uptime_seconds: state.started_at.elapsed().as_secs(),
        route_count: table.len(),
        endpoints,
    })
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn readyz(State((_, ready)): State<SharedState>) -> StatusCode {
    if ready.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Best-effort eskip-shaped rendering of the table. Compiled predicates and
/// filters don't retain their constructor arguments (only name + weight, or
/// name + the bound instance), so this isn't a strict eskip grammar
/// round-trip - spec.md's Non-goals place the eskip grammar itself out of
/// this crate's scope.
fn render_table(table: &RoutingTable) -> String {
    table.routes().iter().map(render_route).collect::<Vec<_>>().join("\n")
}

fn render_route(route: &CompiledRoute) -> String {
    let predicates = route
        .predicates
        .iter()
        .map(|p| format!("{}(weight={})", p.name, p.weight))
        .collect::<Vec<_>>()
        .join(" && ");
    let filters = route.filters.iter().map(|f| f.name.clone()).collect::<Vec<_>>();
    let backend = match &route.backend {
        Backend::Network(uri) => format!("\"{uri}\""),
        Backend::Shunt => "<shunt>".to_string(),
        Backend::Loopback => "<loopback>".to_string(),
        Backend::Dynamic => "<dynamic>".to_string(),
        Backend::LoadBalanced(lb) => format!(
            "<{:?}, {}>",
            lb.balancer.algorithm(),
            lb.endpoints.iter().map(|e| format!("{e:?}")).collect::<Vec<_>>().join(", ")
        ),
    };

    let mut line = format!("{}: {}", route.id, predicates);
    for filter in filters {
        line.push_str(" -> ");
        line.push_str(&filter);
    }
    line.push_str(" -> ");
    line.push_str(&backend);
    line.push(';');
    line
}
