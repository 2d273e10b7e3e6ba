//! Pre- and post-processors (spec.md §4.3), run by the routing engine
//! around each table build: pre-processors edit the merged `RouteSpec` list
//! before compilation, post-processors decorate the compiled table.

use regex::Regex;

use crate::route::{CompiledRoute, FilterUse, PredicateUse, RouteSpec};

/// Runs on the merged route list before matching-tree compilation.
/// Pre-processors are ordered; each receives and returns the full list.
pub trait PreProcessor: Send + Sync {
    fn process(&self, routes: Vec<RouteSpec>) -> Vec<RouteSpec>;
}

/// Prepends a fixed filter chain to every route, e.g. a default access-log
/// or metrics filter every route should carry regardless of its own
/// filter uses.
pub struct DefaultFilters {
    pub filters: Vec<FilterUse>,
}

impl PreProcessor for DefaultFilters {
    fn process(&self, routes: Vec<RouteSpec>) -> Vec<RouteSpec> {
        routes
            .into_iter()
            .map(|mut route| {
                let mut prepended = self.filters.clone();
                prepended.append(&mut route.filters);
                route.filters = prepended;
                route
            })
            .collect()
    }
}

/// Clones every route whose id matches `select` into an additional route,
/// with the id and every predicate/filter argument string rewritten by
/// `select.replace(id, replacement)`. Used for things like generating a
/// `-canary` variant of a route family without hand-authoring each one.
pub struct RouteClone {
    pub select: Regex,
    pub replacement: String,
}

impl PreProcessor for RouteClone {
    fn process(&self, routes: Vec<RouteSpec>) -> Vec<RouteSpec> {
        let mut out = Vec::with_capacity(routes.len() * 2);
        for route in routes {
            if self.select.is_match(&route.id) {
                let mut clone = route.clone();
                clone.id = self
                    .select
                    .replace(&route.id, self.replacement.as_str())
                    .into_owned()
                    .into();
                rewrite_args(&mut clone.predicates, &mut clone.filters, &self.select, &self.replacement);
                out.push(clone);
            }
            out.push(route);
        }
        out
    }
}

/// Rewrites string arguments of every predicate/filter on routes whose id
/// matches `select`, via `select.replace(arg, replacement)`. Used for bulk
/// edits like repointing a backend host across a route family.
pub struct RouteEdit {
    pub select: Regex,
    pub replacement: String,
}

impl PreProcessor for RouteEdit {
    fn process(&self, mut routes: Vec<RouteSpec>) -> Vec<RouteSpec> {
        for route in &mut routes {
            if self.select.is_match(&route.id) {
                rewrite_args(&mut route.predicates, &mut route.filters, &self.select, &self.replacement);
            }
        }
        routes
    }
}

fn rewrite_args(
    predicates: &mut [PredicateUse],
    filters: &mut [FilterUse],
    pattern: &Regex,
    replacement: &str,
) {
    for predicate in predicates {
        for arg in &mut predicate.args {
            if let Some(s) = arg.as_str() {
                if pattern.is_match(s) {
                    *arg = pattern.replace(s, replacement).into_owned().into();
                }
            }
        }
    }
    for filter in filters {
        for arg in &mut filter.args {
            if let Some(s) = arg.as_str() {
                if pattern.is_match(s) {
                    *arg = pattern.replace(s, replacement).into_owned().into();
                }
            }
        }
    }
}

/// Runs on the compiled table. Post-processors may only decorate routes
/// (bind a load balancer, register endpoints, mark creation metrics) —
/// never change a route's identity or matching semantics.
pub trait PostProcessor: Send + Sync {
    fn process(&self, routes: Vec<CompiledRoute>) -> Vec<CompiledRoute>;
}

/// Stamps a creation-time marker via a tracing event; used so operators can
/// see exactly when each route entered the table (spec.md §4.3: "creation
/// metrics marker").
pub struct CreationMetrics;

impl PostProcessor for CreationMetrics {
    fn process(&self, routes: Vec<CompiledRoute>) -> Vec<CompiledRoute> {
        for route in &routes {
            tracing::debug!(route_id = %route.id, "route compiled");
        }
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{BackendSpec, Value};

    fn route(id: &str) -> RouteSpec {
        RouteSpec {
            id: id.into(),
            predicates: vec![PredicateUse {
                name: "Path".into(),
                args: vec![Value::Str("/api".into())],
            }],
            filters: vec![],
            backend: BackendSpec::Shunt,
        }
    }

    #[test]
    fn default_filters_prepend_to_every_route() {
        let processor = DefaultFilters {
            filters: vec![FilterUse {
                name: "accessLog".into(),
                args: vec![],
            }],
        };
        let routes = processor.process(vec![route("a")]);
        assert_eq!(routes[0].filters[0].name, "accessLog");
    }

    #[test]
    fn route_clone_adds_a_rewritten_copy() {
        let processor = RouteClone {
            select: Regex::new("^api$").unwrap(),
            replacement: "api-canary".into(),
        };
        let routes = processor.process(vec![route("api")]);
        assert_eq!(routes.len(), 2);
        assert_eq!(&*routes[0].id, "api-canary");
        assert_eq!(&*routes[1].id, "api");
    }

    #[test]
    fn route_edit_rewrites_matching_predicate_args() {
        let processor = RouteEdit {
            select: Regex::new("/api").unwrap(),
            replacement: "/v2/api".into(),
        };
        let routes = processor.process(vec![route("a")]);
        assert_eq!(routes[0].predicates[0].args[0].as_str(), Some("/v2/api"));
    }
}
