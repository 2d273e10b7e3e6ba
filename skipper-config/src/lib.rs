//! Process-level configuration surface consumed by the skipper proxy core.
//!
//! This crate deliberately knows nothing about routes, predicates or filters
//! (the eskip surface syntax and its parser are external collaborators, see
//! the core crate's documentation). It only owns the configuration knobs
//! spec §6 enumerates: source polling, loop bounds, backend timeouts,
//! passive health check tuning and scheduler defaults.

pub mod cli;
pub mod config;
pub mod error;
pub mod loader;

pub use config::Config;
pub use error::ConfigError;
