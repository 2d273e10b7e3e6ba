//! The matching tree (C3): build from routes, map request -> best route.

pub mod ordering;
pub mod tree;

pub use ordering::OrderKey;
pub use tree::Matcher;
