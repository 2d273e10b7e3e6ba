//! The matching tree's total ordering (spec.md §4.2): among every route
//! whose predicates all match, the winner is the one whose [`OrderKey`]
//! compares greatest.

use std::cmp::Reverse;

use crate::route::predicate::{Facet, HostSpecificity, PathSpecificity};
use crate::route::{CompiledRoute, RouteId};

/// Precomputed tie-break key for one route, evaluated once per table build
/// (not per request).
///
/// Field order doubles as comparison priority: cumulative predicate weight,
/// then path specificity, then host specificity, then method specificity,
/// then (reversed) route id so an earlier-sorting id wins ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    weight: i64,
    path: Option<PathSpecificity>,
    host: Option<HostSpecificity>,
    method: bool,
    id_desc: Reverse<RouteId>,
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.weight
            .cmp(&other.weight)
            .then_with(|| self.path.cmp(&other.path))
            .then_with(|| self.host.cmp(&other.host))
            .then_with(|| self.method.cmp(&other.method))
            .then_with(|| self.id_desc.cmp(&other.id_desc))
    }
}

impl OrderKey {
    pub fn for_route(route: &CompiledRoute) -> Self {
        let mut path = None;
        let mut host = None;
        let mut method = false;

        for predicate in &route.predicates {
            match predicate.predicate.facet() {
                Facet::Path(spec) => {
                    path = Some(path.map_or(spec, |current: PathSpecificity| current.max(spec)));
                }
                Facet::Host(spec) => {
                    host = Some(host.map_or(spec, |current: HostSpecificity| current.max(spec)));
                }
                Facet::Method => method = true,
                Facet::Other => {}
            }
        }

        Self {
            weight: route.cumulative_weight(),
            path,
            host,
            method,
            id_desc: Reverse(route.id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::backend::Backend;
    use crate::route::predicate::{PathSpecificity, Predicate, RequestInfo};
    use crate::route::PredicateInstance;

    struct StubPredicate(Facet, i32);
    impl Predicate for StubPredicate {
        fn matches(&self, _req: &RequestInfo<'_>) -> bool {
            true
        }
        fn weight(&self) -> i32 {
            self.1
        }
        fn facet(&self) -> Facet {
            self.0
        }
    }

    fn route(id: &str, facet: Facet, weight: i32) -> CompiledRoute {
        CompiledRoute {
            id: id.into(),
            predicates: vec![PredicateInstance {
                name: "stub".into(),
                weight,
                predicate: Box::new(StubPredicate(facet, weight)),
            }],
            filters: vec![],
            backend: Backend::Shunt,
        }
    }

    #[test]
    fn higher_weight_wins() {
        let a = OrderKey::for_route(&route("a", Facet::Other, 10));
        let b = OrderKey::for_route(&route("b", Facet::Other, 5));
        assert!(a > b);
    }

    #[test]
    fn literal_path_beats_regex_path_at_equal_weight() {
        let literal = OrderKey::for_route(&route("a", Facet::Path(PathSpecificity::Literal), 0));
        let regex = OrderKey::for_route(&route("b", Facet::Path(PathSpecificity::Regex), 0));
        assert!(literal > regex);
    }

    #[test]
    fn earlier_id_wins_full_tie() {
        let a = OrderKey::for_route(&route("a", Facet::Other, 0));
        let b = OrderKey::for_route(&route("b", Facet::Other, 0));
        assert!(a > b);
    }
}
