//! Scenario 5 (spec.md §8): `r: * -> lifo(1,0,"1s") -> latency("250ms") ->
//! status(200) -> <shunt>`. Three simultaneous requests: one is admitted
//! and completes after the latency, the other two are rejected with 503
//! (`QueueFull`) immediately since `MaxQueueSize=0` leaves no room to wait.
//!
//! The spec's own `"5s"` latency is scaled down to `"250ms"` here so the
//! test does not take five seconds to run; the queueing behavior under test
//! does not depend on the exact delay.

mod common;

use std::time::{Duration, Instant};

use common::{start_proxy, HarnessConfig};
use skipper::route::{BackendSpec, FilterUse, RouteId, RouteSpec, Value};

#[tokio::test]
async fn lifo_saturation_admits_one_and_rejects_the_rest() {
    let routes = vec![RouteSpec {
        id: RouteId::from("r".to_string()),
        predicates: vec![],
        filters: vec![
            FilterUse {
                name: "lifo".to_string(),
                args: vec![Value::Int(1), Value::Int(0), Value::Str("1s".to_string())],
            },
            FilterUse {
                name: "latency".to_string(),
                args: vec![Value::Str("250ms".to_string())],
            },
            FilterUse {
                name: "status".to_string(),
                args: vec![Value::Int(200)],
            },
        ],
        backend: BackendSpec::Shunt,
    }];
    let harness = start_proxy(routes, HarnessConfig::default()).await;

    let client = reqwest::Client::new();
    let url = harness.base_url.clone();

    let started = Instant::now();
    let (r1, r2, r3) = tokio::join!(
        client.get(&url).send(),
        client.get(&url).send(),
        client.get(&url).send(),
    );
    let elapsed = started.elapsed();

    let statuses: Vec<u16> = [r1, r2, r3]
        .into_iter()
        .map(|r| r.unwrap().status().as_u16())
        .collect();

    let ok_count = statuses.iter().filter(|&&s| s == 200).count();
    let rejected_count = statuses.iter().filter(|&&s| s == 503).count();

    assert_eq!(ok_count, 1, "exactly one request should be admitted: {statuses:?}");
    assert_eq!(rejected_count, 2, "the rest should be rejected QueueFull: {statuses:?}");
    assert!(
        elapsed < Duration::from_secs(2),
        "rejections must return immediately, not wait out the admitted request's latency"
    );
}
