//! Process bootstrap (spec.md §6): parses the CLI, loads and validates
//! configuration, builds every registry, the routing engine, the proxy
//! service, the admin surface, and the passive health checker, then hands
//! control to pingora's `Server`.

use std::sync::Arc;

use clap::Parser;
use pingora::server::configuration::{Opt as PingoraOpt, ServerConf as PingoraServerConf};
use pingora::server::Server;
use pingora::services::Service;
use tokio::runtime::Runtime;

use skipper_config::cli::Cli;
use skipper_config::config::Config;
use skipper_config::loader;

use crate::admin;
use crate::endpoint::EndpointRegistry;
use crate::engine::sources::InlineDataClient;
use crate::engine::{CreationMetrics, DataClient, RoutingEngine};
use crate::filters;
use crate::health::{self, PassiveHealthConfig};
use crate::predicates;
use crate::proxy::{PeerTimeouts, SkipperProxy};
use crate::route::{FilterRegistry, PredicateRegistry};
use crate::scheduler::{SchedulerFilterSpec, SchedulerRegistry};

/// How many consecutive table builds an endpoint may be absent from before
/// its counters are evicted (spec.md §4.4 lifecycle).
const ENDPOINT_GC_AFTER: u32 = 3;

pub struct AppContext {
    config: Config,
    engine: Arc<RoutingEngine>,
    endpoint_registry: Arc<EndpointRegistry>,
    server: Server,
}

impl AppContext {
    /// Parses CLI args, loads and validates the process configuration, and
    /// builds every registry, the routing engine, and the pingora `Server`
    /// instance - mirrors `motya::app_context::AppContext::bootstrap`.
    /// `sources` are the `DataClient`s the routing engine polls; a shell
    /// embedding this crate supplies them (the eskip grammar and any
    /// concrete service-discovery client are external collaborators). An
    /// empty list falls back to a single, permanently-empty inline source.
    pub fn bootstrap(sources: Vec<Arc<dyn DataClient>>) -> miette::Result<AppContext> {
        let cli = Cli::parse();
        let config = loader::load(&cli).map_err(|err| miette::miette!("{err}"))?;

        if cli.validate_configs {
            tracing::info!("configuration is valid");
        }
        tracing::debug!(?config, "resolved configuration");

        let mut predicate_registry = PredicateRegistry::new();
        predicates::register_builtins(&mut predicate_registry);

        let mut filter_registry = FilterRegistry::new();
        filters::register_builtins(&mut filter_registry);

        let scheduler_registry = Arc::new(SchedulerRegistry::new());
        filter_registry.register(Arc::new(SchedulerFilterSpec::fifo(scheduler_registry.clone())));
        filter_registry.register(Arc::new(SchedulerFilterSpec::lifo(scheduler_registry.clone())));

        let endpoint_registry = Arc::new(EndpointRegistry::new(ENDPOINT_GC_AFTER));

        let sources = if sources.is_empty() {
            tracing::warn!("no route sources configured; serving an empty table");
            vec![Arc::new(InlineDataClient::new("inline", Vec::new())) as Arc<dyn DataClient>]
        } else {
            sources
        };

        let engine = Arc::new(RoutingEngine::new(
            sources,
            Vec::new(),
            vec![Box::new(CreationMetrics)],
            Arc::new(predicate_registry),
            Arc::new(filter_registry),
            endpoint_registry.clone(),
            config.ignore_trailing_slash,
            config.source_poll_timeout,
        ));

        // skipper has no daemonize/upgrade-socket story of its own yet
        // (spec.md carries no such [MODULE]); only the thread count is
        // actually sourced from our own config, mirroring how `motya`
        // builds its `PingoraOpt`/`PingoraServerConf` pair.
        let pingora_opt = PingoraOpt {
            upgrade: false,
            daemon: false,
            nocapture: false,
            test: cli.validate_configs,
            conf: None,
        };
        let pingora_server_conf = PingoraServerConf {
            threads: config.threads_per_service,
            work_stealing: true,
            ..PingoraServerConf::default()
        };
        let server = Server::new_with_opt_and_conf(pingora_opt, pingora_server_conf);

        Ok(AppContext {
            config,
            engine,
            endpoint_registry,
            server,
        })
    }

    /// Builds the data-plane proxy service plus, if configured, a
    /// background task serving the admin surface, starts the routing
    /// engine's poll loop and the passive health checker, then hands
    /// control to pingora's `Server` for the rest of the process lifetime.
    /// Never returns on success; `run_forever` only exits via process
    /// shutdown.
    pub fn run(mut self) -> miette::Result<()> {
        let timeouts = PeerTimeouts {
            connection_timeout: self.config.timeout_backend,
            read_timeout: self.config.response_header_timeout_backend,
            write_timeout: self.config.response_header_timeout_backend,
            idle_timeout: self.config.close_idle_conns_period,
        };
        let proxy = SkipperProxy::new(
            self.engine.clone(),
            self.endpoint_registry.clone(),
            self.config.max_loopbacks,
            self.config.default_http_status,
            timeouts,
            self.config.experimental_upgrade,
        );
        let mut proxy_service =
            pingora_proxy::http_proxy_service_with_name(&self.server.configuration, proxy, "skipper-proxy");
        proxy_service.add_tcp(&self.config.listen_addr);

        let _background = spawn_background(self.engine.clone(), self.endpoint_registry.clone(), self.config.clone());

        self.server.bootstrap();
        let services: Vec<Box<dyn Service>> = vec![Box::new(proxy_service)];
        self.server.add_services(services);
        Ok(self.server.run_forever())
    }
}

/// Runs the routing engine's poll loop, the passive health checker, and the
/// admin HTTP surface on a dedicated thread with its own tokio runtime,
/// mirroring `river`'s own background-thread-plus-`Runtime` idiom for work
/// that lives outside pingora's own per-service runtime. pingora's
/// `run_forever` takes over the calling thread, so none of this can share
/// it.
fn spawn_background(
    engine: Arc<RoutingEngine>,
    endpoint_registry: Arc<EndpointRegistry>,
    config: Config,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let rt = Runtime::new().expect("failed to create tokio runtime for background tasks");
        rt.block_on(async move {
            engine.load_initial().await;

            let (admin_router, ready) = admin::router(engine.clone(), endpoint_registry.clone());

            tokio::spawn(engine.clone().run());

            if config.enable_passive_health_check {
                let health_config = PassiveHealthConfig {
                    period: config.passive_health_check.period,
                    min_requests: config.passive_health_check.min_requests,
                    failure_rate_threshold: config.passive_health_check.failure_rate_threshold,
                    scale: config.passive_health_check.scale,
                    min_drop_probability: config.passive_health_check.min_drop_probability,
                    max_drop_probability: config.passive_health_check.max_drop_probability,
                };
                tokio::spawn(health::run(endpoint_registry.clone(), health_config));
            }

            if let Some(addr) = config.admin_listen_addr.clone() {
                tokio::spawn(async move {
                    match tokio::net::TcpListener::bind(&addr).await {
                        Ok(listener) => {
                            tracing::info!(%addr, "admin surface listening");
                            if let Err(err) = axum::serve(listener, admin_router).await {
                                tracing::error!(%err, "admin surface exited");
                            }
                        }
                        Err(err) => tracing::error!(%addr, %err, "failed to bind admin surface"),
                    }
                });
            }

            engine.wait_for_first_load().await;
            ready.mark_ready();
            tracing::info!("routing table loaded, marking ready");

            // Keep the runtime alive for the process's lifetime; the
            // spawned tasks above never finish on their own.
            futures_util::future::pending::<()>().await;
        });
    })
}
