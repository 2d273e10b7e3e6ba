//! Builtin filters (spec.md §8's concrete scenarios exercise `status`,
//! `inlineContent`, `setRequestHeader`, `setPath`, and `latency`; the
//! registry is open - any implementation of `route::Filter` plugs in the
//! same way these do).

pub mod builtin;

use std::sync::Arc;

use crate::route::FilterRegistry;

/// Registers every builtin filter into `registry`. Called once at process
/// init, alongside `predicates::register_builtins`.
pub fn register_builtins(registry: &mut FilterRegistry) {
    registry.register(Arc::new(builtin::status::StatusSpec));
    registry.register(Arc::new(builtin::inline_content::InlineContentSpec));
    registry.register(Arc::new(builtin::set_request_header::SetRequestHeaderSpec));
    registry.register(Arc::new(builtin::set_path::SetPathSpec));
    registry.register(Arc::new(builtin::latency::LatencySpec));
}
