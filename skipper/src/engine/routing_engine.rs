//! The routing engine (C4): merges N `DataClient`s into one route map,
//! compiles and publishes a [`RoutingTable`] atomically, and polls sources
//! on an interval for the process's lifetime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::Notify;

use crate::endpoint::EndpointRegistry;
use crate::route::{FilterRegistry, PredicateRegistry, RouteId, RouteSpec};

use super::data_client::DataClient;
use super::processors::{PostProcessor, PreProcessor};
use super::table::{build_table, RoutingTable};

/// Process-wide routing engine. Construct once at startup; `run` drives it
/// for the rest of the process lifetime.
pub struct RoutingEngine {
    sources: Vec<Arc<dyn DataClient>>,
    // Per-source Id -> Route map, in the same (fixed) order as `sources`;
    // the published snapshot is their union with earlier sources winning
    // ties (spec.md §9 open question, resolved this way - see DESIGN.md).
    source_routes: Mutex<Vec<HashMap<RouteId, RouteSpec>>>,

    pre_processors: Vec<Box<dyn PreProcessor>>,
    post_processors: Vec<Box<dyn PostProcessor>>,

    predicate_registry: Arc<PredicateRegistry>,
    filter_registry: Arc<FilterRegistry>,
    endpoint_registry: Arc<EndpointRegistry>,

    ignore_trailing_slash: bool,
    poll_interval: Duration,

    table: ArcSwap<RoutingTable>,
    first_load: Notify,
    first_load_done: AtomicBool,
}

impl RoutingEngine {
    pub fn new(
        sources: Vec<Arc<dyn DataClient>>,
        pre_processors: Vec<Box<dyn PreProcessor>>,
        post_processors: Vec<Box<dyn PostProcessor>>,
        predicate_registry: Arc<PredicateRegistry>,
        filter_registry: Arc<FilterRegistry>,
        endpoint_registry: Arc<EndpointRegistry>,
        ignore_trailing_slash: bool,
        poll_interval: Duration,
    ) -> Self {
        let source_count = sources.len();
        Self {
            sources,
            source_routes: Mutex::new(vec![HashMap::new(); source_count]),
            pre_processors,
            post_processors,
            predicate_registry,
            filter_registry,
            endpoint_registry,
            ignore_trailing_slash,
            poll_interval,
            table: ArcSwap::from_pointee(RoutingTable::new(Vec::new(), ignore_trailing_slash)),
            first_load: Notify::new(),
            first_load_done: AtomicBool::new(false),
        }
    }

    /// The current table. Cheap: an `Arc` clone behind an atomic load.
    pub fn table(&self) -> Arc<RoutingTable> {
        self.table.load_full()
    }

    /// Resolves once the first successful build has published a table.
    /// The listener awaits this before accepting traffic, if configured to.
    pub async fn wait_for_first_load(&self) {
        if self.first_load_done.load(Ordering::Acquire) {
            return;
        }
        self.first_load.notified().await;
    }

    /// Seeds every source's initial snapshot and publishes the first table.
    pub async fn load_initial(&self) {
        {
            let mut source_routes = self.source_routes.lock().expect("engine mutex poisoned");
            for (idx, source) in self.sources.iter().enumerate() {
                match source.load_all().await {
                    Ok(routes) => {
                        source_routes[idx] = routes.into_iter().map(|r| (r.id.clone(), r)).collect();
                    }
                    Err(err) => {
                        tracing::warn!(source = source.name(), error = %err, "initial load failed");
                    }
                }
            }
        }
        self.rebuild_and_publish();
        self.first_load_done.store(true, Ordering::Release);
        self.first_load.notify_waiters();
    }

    /// Polls every source once, applying its delta to the per-source map,
    /// then rebuilds and republishes if anything changed.
    pub async fn poll_once(&self) {
        let mut changed = false;
        for (idx, source) in self.sources.iter().enumerate() {
            match source.load_update().await {
                Ok((upserts, deletes)) => {
                    if upserts.is_empty() && deletes.is_empty() {
                        continue;
                    }
                    let mut source_routes = self.source_routes.lock().expect("engine mutex poisoned");
                    for route in upserts {
                        source_routes[idx].insert(route.id.clone(), route);
                    }
                    for id in deletes {
                        source_routes[idx].remove(id.as_str());
                    }
                    changed = true;
                }
                Err(err) => {
                    // Transient source error: prior view for this source is
                    // left exactly as-is (spec.md §4.3 failure semantics).
                    tracing::warn!(source = source.name(), error = %err, "source poll failed");
                }
            }
        }

        if changed {
            self.rebuild_and_publish();
        }
    }

    /// Runs `poll_once` on `poll_interval` forever. Intended to be
    /// `tokio::spawn`'d once at startup.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    fn merged_routes(&self) -> Vec<RouteSpec> {
        let source_routes = self.source_routes.lock().expect("engine mutex poisoned");
        // Fixed source-priority order: earlier sources win on Id conflicts.
        let mut seen = std::collections::HashSet::new();
        let mut merged = Vec::new();
        for map in source_routes.iter() {
            for (id, route) in map {
                if seen.insert(id.clone()) {
                    merged.push(route.clone());
                }
            }
        }
        merged
    }

    fn rebuild_and_publish(&self) {
        let mut routes = self.merged_routes();
        for processor in &self.pre_processors {
            routes = processor.process(routes);
        }

        let table = build_table(
            routes,
            &self.predicate_registry,
            &self.filter_registry,
            &self.endpoint_registry,
            &self.post_processors,
            self.ignore_trailing_slash,
        );

        let live = table.live_endpoints();
        self.endpoint_registry.sweep(&live);
        self.table.store(Arc::new(table));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sources::inline::InlineDataClient;
    use crate::route::BackendSpec;

    fn route(id: &str) -> RouteSpec {
        RouteSpec {
            id: id.into(),
            predicates: vec![],
            filters: vec![],
            backend: BackendSpec::Shunt,
        }
    }

    #[tokio::test]
    async fn load_initial_publishes_a_table_and_signals_first_load() {
        let source = Arc::new(InlineDataClient::new("inline", vec![route("a")]));
        let engine = RoutingEngine::new(
            vec![source],
            vec![],
            vec![],
            Arc::new(PredicateRegistry::new()),
            Arc::new(FilterRegistry::new()),
            Arc::new(EndpointRegistry::new(3)),
            false,
            Duration::from_millis(10),
        );

        engine.load_initial().await;
        assert_eq!(engine.table().len(), 1);
    }

    #[tokio::test]
    async fn earlier_source_wins_on_id_conflict() {
        let primary = Arc::new(InlineDataClient::new("primary", vec![route("dup")]));
        let secondary = Arc::new(InlineDataClient::new("secondary", vec![route("dup")]));
        let engine = RoutingEngine::new(
            vec![primary, secondary],
            vec![],
            vec![],
            Arc::new(PredicateRegistry::new()),
            Arc::new(FilterRegistry::new()),
            Arc::new(EndpointRegistry::new(3)),
            false,
            Duration::from_millis(10),
        );

        engine.load_initial().await;
        assert_eq!(engine.table().len(), 1);
    }
}
