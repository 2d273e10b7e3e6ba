//! Predicate contract: name -> spec lookup (C2) and the per-request match
//! capability (C3 consumes this).

use thiserror::Error;

use crate::route::value::Value;

/// A read-only view of the request a predicate, or the matching tree
/// itself, evaluates against. Built fresh from the live request header on
/// every match attempt; never stored past the call.
pub struct RequestInfo<'a> {
    pub method: &'a http::Method,
    pub uri: &'a http::Uri,
    pub headers: &'a http::HeaderMap,
    pub client_addr: Option<std::net::SocketAddr>,
}

/// A compiled predicate instance attached to a route.
///
/// Instances are shared across concurrent requests: `matches` must not
/// mutate shared state without its own synchronization.
pub trait Predicate: Send + Sync {
    fn matches(&self, req: &RequestInfo<'_>) -> bool;

    /// Static contribution to the matching-tree tie-break order. Path
    /// literal predicates should outweigh path-regex predicates; most
    /// predicates contribute 0.
    fn weight(&self) -> i32 {
        0
    }

    /// Which dimension of the matching tree's total order (spec.md §4.2,
    /// criteria 2-4) this predicate occupies. Most predicates are `Other`
    /// and only contribute `weight`; the builtin `Path`/`Host`/`Method`
    /// family reports its specificity so the matching tree can rank routes
    /// without knowing about any concrete predicate implementation.
    fn facet(&self) -> Facet {
        Facet::Other
    }

    /// An optional literal/prefix path the matching tree's trie can index
    /// on for O(path-length) pruning (spec.md §4.2 implementation
    /// guidance). Predicates with no fixed path component (regex paths,
    /// host/method/header predicates, etc.) return `None` and the route
    /// falls into the tree's residual bucket, evaluated on every lookup.
    fn path_hint(&self) -> Option<PathHint> {
        None
    }
}

/// A path fragment a predicate can be indexed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathHint {
    /// Matches the path exactly.
    Literal(String),
    /// Matches the path and anything nested under it.
    Prefix(String),
}

/// The matching-tree tie-break dimension a predicate occupies (spec.md
/// §4.2, criteria 2-4: path specificity, host specificity, method
/// specificity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Other,
    Path(PathSpecificity),
    Host(HostSpecificity),
    Method,
}

/// Path-predicate specificity, most to least specific (spec.md §4.2
/// criterion 2: "literal > prefix/subtree > regex > none").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathSpecificity {
    Regex = 0,
    Prefix = 1,
    Literal = 2,
}

/// Host-predicate specificity (spec.md §4.2 criterion 3:
/// "host-exact > host-regex > no host constraint").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HostSpecificity {
    Regex = 0,
    Exact = 1,
}

/// A predicate blueprint, registered once at process init and consulted at
/// table-build time.
pub trait PredicateSpec: Send + Sync {
    fn name(&self) -> &str;
    fn create(&self, args: &[Value]) -> Result<Box<dyn Predicate>, PredicateError>;
}

#[derive(Debug, Error)]
pub enum PredicateError {
    #[error("predicate {name:?} expects {expected}, got {got} argument(s)")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("predicate {name:?} argument {index}: {reason}")]
    InvalidArgument {
        name: String,
        index: usize,
        reason: String,
    },
}
