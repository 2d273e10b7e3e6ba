//! Builtin predicates (spec.md §8's concrete scenarios exercise `Path`;
//! the registry is open - any implementation of `route::Predicate` plugs
//! in the same way these do).

pub mod builtin;

use std::sync::Arc;

use crate::route::PredicateRegistry;

/// Registers every builtin predicate into `registry`. Called once at
/// process init; nothing here is special-cased by the matching tree or
/// routing engine beyond the `Predicate`/`PredicateSpec` contracts.
pub fn register_builtins(registry: &mut PredicateRegistry) {
    registry.register(Arc::new(builtin::path::PathSpec));
    registry.register(Arc::new(builtin::path::PathSubtreeSpec));
    registry.register(Arc::new(builtin::path::PathRegexSpec));
    registry.register(Arc::new(builtin::host::HostSpec));
    registry.register(Arc::new(builtin::host::HostRegexSpec));
    registry.register(Arc::new(builtin::method::MethodSpec));
}
