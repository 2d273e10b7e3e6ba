//! Passive health checking (C9): derives a per-endpoint drop probability
//! from recent success/failure counts, with no active probing.

pub mod checker;

pub use checker::{drop_probability, run, PassiveHealthConfig};
