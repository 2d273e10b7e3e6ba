//! The routing engine (C4): merges data sources, compiles routes, and
//! publishes the current table atomically.

pub mod data_client;
pub mod processors;
pub mod routing_engine;
pub mod sources;
pub mod table;

pub use data_client::{DataClient, DataClientError};
pub use processors::{CreationMetrics, DefaultFilters, PostProcessor, PreProcessor, RouteClone, RouteEdit};
pub use routing_engine::RoutingEngine;
pub use table::{build_table, compile_route, BuildError, RoutingTable};
