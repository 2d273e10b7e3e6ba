//! A compiled, immutable routing table (spec.md §4.3 publication model):
//! built once, published via an atomic pointer swap, read by every request
//! without a lock.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::balancer::{Algorithm, LoadBalancer};
use crate::endpoint::EndpointRegistry;
use crate::matching::Matcher;
use crate::route::{
    Backend, BackendSpec, CompiledRoute, EndpointDescriptor, FilterInstance, FilterRegistry,
    LoadBalancedBackend, PredicateInstance, PredicateRegistry, RequestInfo, RouteSpec,
};

use super::processors::PostProcessor;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("route {route_id:?}: unknown predicate {name:?}")]
    UnknownPredicate { route_id: String, name: String },
    #[error("route {route_id:?}: unknown filter {name:?}")]
    UnknownFilter { route_id: String, name: String },
    #[error("route {route_id:?}: predicate {name:?}: {source}")]
    Predicate {
        route_id: String,
        name: String,
        #[source]
        source: crate::route::PredicateError,
    },
    #[error("route {route_id:?}: filter {name:?}: {source}")]
    Filter {
        route_id: String,
        name: String,
        #[source]
        source: crate::route::FilterError,
    },
    #[error("route {route_id:?}: load-balanced backend has no endpoints")]
    EmptyEndpointList { route_id: String },
}

/// Resolves one [`RouteSpec`] into a [`CompiledRoute`] against the
/// predicate/filter registries, registering any endpoint it references in
/// `endpoint_registry`.
pub fn compile_route(
    spec: &RouteSpec,
    predicates: &PredicateRegistry,
    filters: &FilterRegistry,
    endpoint_registry: &EndpointRegistry,
) -> Result<CompiledRoute, BuildError> {
    let mut predicate_instances = Vec::with_capacity(spec.predicates.len());
    for use_ in &spec.predicates {
        let predicate_spec = predicates.get(&use_.name).ok_or_else(|| BuildError::UnknownPredicate {
            route_id: spec.id.to_string(),
            name: use_.name.clone(),
        })?;
        let predicate = predicate_spec.create(&use_.args).map_err(|source| BuildError::Predicate {
            route_id: spec.id.to_string(),
            name: use_.name.clone(),
            source,
        })?;
        predicate_instances.push(PredicateInstance {
            weight: predicate.weight(),
            name: use_.name.clone(),
            predicate,
        });
    }

    let mut filter_instances = Vec::with_capacity(spec.filters.len());
    for use_ in &spec.filters {
        let filter_spec = filters.get(&use_.name).ok_or_else(|| BuildError::UnknownFilter {
            route_id: spec.id.to_string(),
            name: use_.name.clone(),
        })?;
        let filter = filter_spec.create_filter(&use_.args).map_err(|source| BuildError::Filter {
            route_id: spec.id.to_string(),
            name: use_.name.clone(),
            source,
        })?;
        filter_instances.push(FilterInstance {
            name: use_.name.clone(),
            filter,
        });
    }

    let backend = compile_backend(spec, endpoint_registry)?;

    Ok(CompiledRoute {
        id: spec.id.clone(),
        predicates: predicate_instances,
        filters: filter_instances,
        backend,
    })
}

fn compile_backend(spec: &RouteSpec, endpoint_registry: &EndpointRegistry) -> Result<Backend, BuildError> {
    match &spec.backend {
        BackendSpec::Network(uri) => Ok(Backend::Network(uri.clone())),
        BackendSpec::Shunt => Ok(Backend::Shunt),
        BackendSpec::Loopback => Ok(Backend::Loopback),
        BackendSpec::Dynamic => Ok(Backend::Dynamic),
        BackendSpec::LoadBalanced {
            algorithm,
            endpoints,
            fade_in_duration,
            fade_in_exponent,
        } => {
            if endpoints.is_empty() {
                return Err(BuildError::EmptyEndpointList {
                    route_id: spec.id.to_string(),
                });
            }
            for endpoint in endpoints {
                endpoint_registry.get_or_create(endpoint);
            }
            let balancer = LoadBalancer::new(*algorithm).with_fade_in(*fade_in_duration, *fade_in_exponent);
            Ok(Backend::LoadBalanced(Arc::new(LoadBalancedBackend {
                endpoints: endpoints.clone(),
                balancer,
            })))
        }
    }
}

/// The published, immutable snapshot a request matches against.
pub struct RoutingTable {
    matcher: Matcher,
    built_at: Instant,
}

impl RoutingTable {
    pub fn new(routes: Vec<CompiledRoute>, ignore_trailing_slash: bool) -> Self {
        Self {
            matcher: Matcher::build(routes, ignore_trailing_slash),
            built_at: Instant::now(),
        }
    }

    pub fn match_request<'a>(
        &'a self,
        req: &RequestInfo<'_>,
    ) -> Option<(&'a CompiledRoute, std::collections::HashMap<String, String>)> {
        self.matcher.match_request(req)
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matcher.len()
    }

    pub fn routes(&self) -> &[CompiledRoute] {
        self.matcher.routes()
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    /// Every endpoint any `LoadBalanced` route in this table references;
    /// passed to `EndpointRegistry::sweep` after publication.
    pub fn live_endpoints(&self) -> HashSet<EndpointDescriptor> {
        self.routes()
            .iter()
            .filter_map(|route| match &route.backend {
                Backend::LoadBalanced(lb) => Some(lb.endpoints.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

/// Builds a full table from a merged route list: compile each route, run
/// post-processors, wrap in a [`RoutingTable`]. A single route's build
/// error is logged and that route is dropped — spec.md §4.3 scopes
/// `BuildError` per-route, not per-table, so one bad route doesn't take
/// down the rest of the table.
pub fn build_table(
    specs: Vec<RouteSpec>,
    predicates: &PredicateRegistry,
    filters: &FilterRegistry,
    endpoint_registry: &EndpointRegistry,
    post_processors: &[Box<dyn PostProcessor>],
    ignore_trailing_slash: bool,
) -> RoutingTable {
    let mut compiled = Vec::with_capacity(specs.len());
    for spec in &specs {
        match compile_route(spec, predicates, filters, endpoint_registry) {
            Ok(route) => compiled.push(route),
            Err(err) => tracing::warn!(route_id = %spec.id, error = %err, "dropping route: build failed"),
        }
    }

    for post_processor in post_processors {
        compiled = post_processor.process(compiled);
    }

    RoutingTable::new(compiled, ignore_trailing_slash)
}
