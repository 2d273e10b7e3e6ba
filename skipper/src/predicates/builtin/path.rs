//! `Path`, `PathSubtree`, `PathRegex` - the three path-matching predicates
//! spec.md §4.2 ranks "literal > prefix/subtree > regex > none".

use regex::Regex;

use crate::route::predicate::{Facet, PathHint, PathSpecificity};
use crate::route::{Predicate, PredicateError, PredicateSpec, RequestInfo, Value};

fn single_string_arg(name: &str, args: &[Value]) -> Result<String, PredicateError> {
    match args {
        [Value::Str(s)] => Ok(s.clone()),
        [other] => Err(PredicateError::InvalidArgument {
            name: name.to_string(),
            index: 0,
            reason: format!("expected a string, got {other}"),
        }),
        _ => Err(PredicateError::Arity {
            name: name.to_string(),
            expected: "1 string argument",
            got: args.len(),
        }),
    }
}

/// `Path("/users/{id}")`. Matches exactly, including `matchit`-style named
/// and wildcard path template segments.
pub struct Path {
    pattern: String,
    router: matchit::Router<()>,
}

impl Predicate for Path {
    fn matches(&self, req: &RequestInfo<'_>) -> bool {
        self.router.at(req.uri.path()).is_ok()
    }

    fn facet(&self) -> Facet {
        Facet::Path(PathSpecificity::Literal)
    }

    fn path_hint(&self) -> Option<PathHint> {
        Some(PathHint::Literal(self.pattern.clone()))
    }
}

pub struct PathSpec;
impl PredicateSpec for PathSpec {
    fn name(&self) -> &str {
        "Path"
    }

    fn create(&self, args: &[Value]) -> Result<Box<dyn Predicate>, PredicateError> {
        let pattern = single_string_arg("Path", args)?;
        let mut router = matchit::Router::new();
        router.insert(&pattern, ()).map_err(|e| PredicateError::InvalidArgument {
            name: "Path".to_string(),
            index: 0,
            reason: e.to_string(),
        })?;
        Ok(Box::new(Path { pattern, router }))
    }
}

/// `PathSubtree("/api")`. Matches the path itself and anything nested
/// under it.
pub struct PathSubtree {
    prefix: String,
}

impl Predicate for PathSubtree {
    fn matches(&self, req: &RequestInfo<'_>) -> bool {
        let path = req.uri.path();
        path == self.prefix || path.strip_prefix(&self.prefix).is_some_and(|rest| rest.starts_with('/'))
    }

    fn facet(&self) -> Facet {
        Facet::Path(PathSpecificity::Prefix)
    }

    fn path_hint(&self) -> Option<PathHint> {
        Some(PathHint::Prefix(self.prefix.clone()))
    }
}

pub struct PathSubtreeSpec;
impl PredicateSpec for PathSubtreeSpec {
    fn name(&self) -> &str {
        "PathSubtree"
    }

    fn create(&self, args: &[Value]) -> Result<Box<dyn Predicate>, PredicateError> {
        let prefix = single_string_arg("PathSubtree", args)?;
        Ok(Box::new(PathSubtree {
            prefix: prefix.trim_end_matches('/').to_string(),
        }))
    }
}

/// `PathRegex("^/api/v[0-9]+/.*")`. Least specific of the path family; has
/// no fixed literal/prefix component, so the matching tree can't index it
/// and every lookup evaluates it directly.
pub struct PathRegex {
    regex: Regex,
}

impl Predicate for PathRegex {
    fn matches(&self, req: &RequestInfo<'_>) -> bool {
        self.regex.is_match(req.uri.path())
    }

    fn facet(&self) -> Facet {
        Facet::Path(PathSpecificity::Regex)
    }
}

pub struct PathRegexSpec;
impl PredicateSpec for PathRegexSpec {
    fn name(&self) -> &str {
        "PathRegex"
    }

    fn create(&self, args: &[Value]) -> Result<Box<dyn Predicate>, PredicateError> {
        let pattern = single_string_arg("PathRegex", args)?;
        let regex = Regex::new(&pattern).map_err(|e| PredicateError::InvalidArgument {
            name: "PathRegex".to_string(),
            index: 0,
            reason: e.to_string(),
        })?;
        Ok(Box::new(PathRegex { regex }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(path: &str) -> (http::Uri, http::HeaderMap) {
        (path.parse().unwrap(), http::HeaderMap::new())
    }

    fn info<'a>(uri: &'a http::Uri, headers: &'a http::HeaderMap) -> RequestInfo<'a> {
        RequestInfo {
            method: &http::Method::GET,
            uri,
            headers,
            client_addr: None,
        }
    }

    #[test]
    fn path_matches_literal_and_template() {
        let p = PathSpec.create(&[Value::from("/users/{id}")]).unwrap();
        let (uri, headers) = req("/users/42");
        assert!(p.matches(&info(&uri, &headers)));
        let (uri, headers) = req("/users");
        assert!(!p.matches(&info(&uri, &headers)));
    }

    #[test]
    fn path_subtree_matches_nested_and_exact() {
        let p = PathSubtreeSpec.create(&[Value::from("/api")]).unwrap();
        for path in ["/api", "/api/v1/x"] {
            let (uri, headers) = req(path);
            assert!(p.matches(&info(&uri, &headers)));
        }
        let (uri, headers) = req("/apix");
        assert!(!p.matches(&info(&uri, &headers)));
    }

    #[test]
    fn path_regex_matches_pattern() {
        let p = PathRegexSpec.create(&[Value::from("^/v[0-9]+/.*")]).unwrap();
        let (uri, headers) = req("/v2/things");
        assert!(p.matches(&info(&uri, &headers)));
        let (uri, headers) = req("/other");
        assert!(!p.matches(&info(&uri, &headers)));
    }
}
