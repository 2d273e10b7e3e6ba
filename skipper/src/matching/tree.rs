//! The matching tree (C3): given a parsed request, returns the best
//! matching route, or `None`.
//!
//! A `matchit` trie prunes by path literal/prefix; each leaf holds the
//! (small) list of routes sharing that path shape, plus a residual bucket
//! for routes with no fixed path component (regex paths, or none at all).
//! Either way, lookup is O(path-length + k) rather than a linear scan of
//! the whole table (spec.md §4.2 implementation guidance).

use std::collections::HashMap;

use matchit::Router;

use crate::route::predicate::PathHint;
use crate::route::{CompiledRoute, RequestInfo};

use super::ordering::OrderKey;

pub struct Matcher {
    routes: Vec<CompiledRoute>,
    keys: Vec<OrderKey>,
    trie: Router<Vec<usize>>,
    residual: Vec<usize>,
    ignore_trailing_slash: bool,
}

impl Matcher {
    /// Builds a matcher over `routes`. `ignore_trailing_slash` normalizes
    /// both the build-time path hints and lookup paths to the form without
    /// a trailing slash (spec.md §4.2 edge-case policy; resolved as a
    /// build-time normalization, see `DESIGN.md`).
    pub fn build(routes: Vec<CompiledRoute>, ignore_trailing_slash: bool) -> Self {
        let keys: Vec<OrderKey> = routes.iter().map(OrderKey::for_route).collect();

        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
        let mut residual = Vec::new();

        for (idx, route) in routes.iter().enumerate() {
            let hint = route
                .predicates
                .iter()
                .find_map(|instance| instance.predicate.path_hint());

            match hint {
                Some(PathHint::Literal(path)) => {
                    let key = normalize(&path, ignore_trailing_slash);
                    buckets.entry(key).or_default().push(idx);
                }
                Some(PathHint::Prefix(path)) => {
                    let key = prefix_pattern(&normalize(&path, ignore_trailing_slash));
                    buckets.entry(key).or_default().push(idx);
                }
                None => residual.push(idx),
            }
        }

        let mut trie = Router::new();
        for (pattern, indices) in buckets {
            // Two distinct prefix hints can collide on the same matchit
            // pattern (e.g. differing only by a predicate matchit doesn't
            // know about); fall back to the residual bucket rather than
            // silently drop a route.
            if trie.insert(pattern, indices.clone()).is_err() {
                residual.extend(indices);
            }
        }

        Self {
            routes,
            keys,
            trie,
            residual,
            ignore_trailing_slash,
        }
    }

    /// Returns the best-matching route and any path-template parameters a
    /// path predicate extracted, or `None` if no route's predicates all
    /// match.
    pub fn match_request<'m>(
        &'m self,
        req: &RequestInfo<'_>,
    ) -> Option<(&'m CompiledRoute, HashMap<String, String>)> {
        let path = normalize(req.uri.path(), self.ignore_trailing_slash);

        let mut candidates: Vec<usize> = Vec::new();
        let mut params = HashMap::new();
        if let Ok(matched) = self.trie.at(&path) {
            candidates.extend(matched.value.iter().copied());
            for (key, value) in matched.params.iter() {
                params.insert(key.to_string(), value.to_string());
            }
        }
        candidates.extend(self.residual.iter().copied());

        candidates
            .into_iter()
            .filter(|&idx| self.routes[idx].matches(req))
            .max_by_key(|&idx| self.keys[idx].clone())
            .map(|idx| (&self.routes[idx], params))
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }
}

fn normalize(path: &str, ignore_trailing_slash: bool) -> String {
    if ignore_trailing_slash && path.len() > 1 && path.ends_with('/') {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}

fn prefix_pattern(path: &str) -> String {
    let clean = path.trim_end_matches('/');
    if clean.is_empty() {
        "/{*skipper_rest}".to_string()
    } else {
        format!("{clean}/{{*skipper_rest}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::backend::Backend;
    use crate::route::predicate::{Facet, Predicate};
    use crate::route::PredicateInstance;

    struct LiteralPath(&'static str);
    impl Predicate for LiteralPath {
        fn matches(&self, req: &RequestInfo<'_>) -> bool {
            req.uri.path() == self.0
        }
        fn facet(&self) -> Facet {
            Facet::Path(crate::route::predicate::PathSpecificity::Literal)
        }
        fn path_hint(&self) -> Option<PathHint> {
            Some(PathHint::Literal(self.0.to_string()))
        }
    }

    struct AlwaysTrue;
    impl Predicate for AlwaysTrue {
        fn matches(&self, _req: &RequestInfo<'_>) -> bool {
            true
        }
    }

    fn route(id: &str, predicate: Box<dyn Predicate>) -> CompiledRoute {
        CompiledRoute {
            id: id.into(),
            predicates: vec![PredicateInstance {
                name: "p".into(),
                weight: 0,
                predicate,
            }],
            filters: vec![],
            backend: Backend::Shunt,
        }
    }

    fn req_info<'a>(uri: &'a http::Uri, headers: &'a http::HeaderMap) -> RequestInfo<'a> {
        RequestInfo {
            method: &http::Method::GET,
            uri,
            headers,
            client_addr: None,
        }
    }

    #[test]
    fn empty_table_matches_nothing() {
        let matcher = Matcher::build(vec![], false);
        let uri: http::Uri = "/anything".parse().unwrap();
        let headers = http::HeaderMap::new();
        assert!(matcher.match_request(&req_info(&uri, &headers)).is_none());
    }

    #[test]
    fn literal_path_is_indexed_and_matched() {
        let matcher = Matcher::build(
            vec![route("hello", Box::new(LiteralPath("/hello")))],
            false,
        );
        let headers = http::HeaderMap::new();
        let uri: http::Uri = "/hello".parse().unwrap();
        let (matched, _) = matcher.match_request(&req_info(&uri, &headers)).unwrap();
        assert_eq!(&*matched.id, "hello");

        let miss: http::Uri = "/other".parse().unwrap();
        assert!(matcher.match_request(&req_info(&miss, &headers)).is_none());
    }

    #[test]
    fn residual_routes_are_still_considered() {
        let matcher = Matcher::build(vec![route("catch-all", Box::new(AlwaysTrue))], false);
        let headers = http::HeaderMap::new();
        let uri: http::Uri = "/whatever".parse().unwrap();
        let (matched, _) = matcher.match_request(&req_info(&uri, &headers)).unwrap();
        assert_eq!(&*matched.id, "catch-all");
    }

    #[test]
    fn deterministic_id_tie_break() {
        let matcher = Matcher::build(
            vec![
                route("b-route", Box::new(AlwaysTrue)),
                route("a-route", Box::new(AlwaysTrue)),
            ],
            false,
        );
        let headers = http::HeaderMap::new();
        let uri: http::Uri = "/x".parse().unwrap();
        let (matched, _) = matcher.match_request(&req_info(&uri, &headers)).unwrap();
        assert_eq!(&*matched.id, "a-route");
    }
}
