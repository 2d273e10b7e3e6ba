//! Shared harness for end-to-end proxy tests: builds a real `SkipperProxy`
//! behind a real pingora `Server` on a loopback port, the same way
//! `motya`'s own `tests/src/common/test_setup.rs` spins up its proxy for
//! its integration suite.

use std::net::TcpListener as StdTcpListener;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use pingora::server::configuration::{Opt, ServerConf};
use pingora::server::Server;
use pingora::services::Service;

use skipper::endpoint::EndpointRegistry;
use skipper::engine::sources::InlineDataClient;
use skipper::engine::{CreationMetrics, DataClient, RoutingEngine};
use skipper::filters;
use skipper::predicates;
use skipper::proxy::{PeerTimeouts, SkipperProxy};
use skipper::route::{FilterRegistry, PredicateRegistry, RouteSpec};
use skipper::scheduler::{SchedulerFilterSpec, SchedulerRegistry};

pub struct HarnessConfig {
    pub max_loopbacks: u32,
    pub default_http_status: u16,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_loopbacks: 10,
            default_http_status: 404,
        }
    }
}

/// A running proxy plus the endpoint registry behind it, kept alive for as
/// long as this value lives. The server thread is never joined - it runs
/// `run_forever` for the rest of the test binary's life, same as the
/// teacher's own test harness.
pub struct Harness {
    pub base_url: String,
    pub endpoint_registry: Arc<EndpointRegistry>,
    _server_thread: thread::JoinHandle<()>,
}

pub fn free_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

pub async fn start_proxy(routes: Vec<RouteSpec>, config: HarnessConfig) -> Harness {
    let mut predicate_registry = PredicateRegistry::new();
    predicates::register_builtins(&mut predicate_registry);

    let mut filter_registry = FilterRegistry::new();
    filters::register_builtins(&mut filter_registry);

    let scheduler_registry = Arc::new(SchedulerRegistry::new());
    filter_registry.register(Arc::new(SchedulerFilterSpec::fifo(scheduler_registry.clone())));
    filter_registry.register(Arc::new(SchedulerFilterSpec::lifo(scheduler_registry.clone())));

    let endpoint_registry = Arc::new(EndpointRegistry::new(3));
    let source = Arc::new(InlineDataClient::new("test", routes)) as Arc<dyn DataClient>;

    let engine = Arc::new(RoutingEngine::new(
        vec![source],
        Vec::new(),
        vec![Box::new(CreationMetrics)],
        Arc::new(predicate_registry),
        Arc::new(filter_registry),
        endpoint_registry.clone(),
        false,
        Duration::from_secs(3600),
    ));
    engine.load_initial().await;

    let port = free_port();
    let addr = format!("127.0.0.1:{port}");

    let timeouts = PeerTimeouts {
        connection_timeout: Duration::from_secs(2),
        read_timeout: Duration::from_secs(10),
        write_timeout: Duration::from_secs(10),
        idle_timeout: Duration::from_secs(30),
    };
    let proxy = SkipperProxy::new(
        engine.clone(),
        endpoint_registry.clone(),
        config.max_loopbacks,
        config.default_http_status,
        timeouts,
        false,
    );

    let opt = Opt {
        upgrade: false,
        daemon: false,
        nocapture: false,
        test: false,
        conf: None,
    };
    let server_conf = ServerConf {
        threads: 1,
        work_stealing: true,
        ..ServerConf::default()
    };
    let mut server = Server::new_with_opt_and_conf(opt, server_conf);
    let mut proxy_service =
        pingora_proxy::http_proxy_service_with_name(&server.configuration, proxy, "test-proxy");
    proxy_service.add_tcp(&addr);

    server.bootstrap();
    let services: Vec<Box<dyn Service>> = vec![Box::new(proxy_service)];
    server.add_services(services);

    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        tx.send(()).expect("failed to send ready signal");
        server.run_forever();
    });
    rx.recv().expect("proxy server thread failed to start");

    wait_for_listener(&addr).await;

    Harness {
        base_url: format!("http://{addr}"),
        endpoint_registry,
        _server_thread: handle,
    }
}

async fn wait_for_listener(addr: &str) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("proxy never started listening on {addr}");
}
