//! End-to-end proxy lifecycle scenarios (spec.md §8's concrete scenarios
//! 1-4): a real `SkipperProxy` behind a real pingora listener, driven with
//! `reqwest`.

mod common;

use common::{start_proxy, HarnessConfig};
use skipper::route::{BackendSpec, FilterUse, PredicateUse, RouteId, RouteSpec, Value};
use wiremock::matchers::{any, header};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn route(id: &str, predicates: Vec<PredicateUse>, filters: Vec<FilterUse>, backend: BackendSpec) -> RouteSpec {
    RouteSpec {
        id: RouteId::from(id.to_string()),
        predicates,
        filters,
        backend,
    }
}

fn path_predicate(pattern: &str) -> PredicateUse {
    PredicateUse {
        name: "Path".to_string(),
        args: vec![Value::Str(pattern.to_string())],
    }
}

fn status_filter(code: i64) -> FilterUse {
    FilterUse {
        name: "status".to_string(),
        args: vec![Value::Int(code)],
    }
}

fn inline_content_filter(body: &str) -> FilterUse {
    FilterUse {
        name: "inlineContent".to_string(),
        args: vec![Value::Str(body.to_string())],
    }
}

/// Scenario 1: `r: Path("/hello") -> status(201) -> inlineContent("ok") -> <shunt>`.
#[tokio::test]
async fn shunt_with_status_filter() {
    let routes = vec![route(
        "r",
        vec![path_predicate("/hello")],
        vec![status_filter(201), inline_content_filter("ok")],
        BackendSpec::Shunt,
    )];
    let harness = start_proxy(routes, HarnessConfig::default()).await;

    let resp = reqwest::get(format!("{}/hello", harness.base_url)).await.unwrap();
    assert_eq!(resp.status(), 201);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

/// Scenario 2: `r: * -> setRequestHeader("X-A","1") -> "http://backend.test:80"`.
/// Upstream echoes back whatever it received; the proxy's response status
/// and body must propagate, and the backend must have seen the rewritten
/// header.
#[tokio::test]
async fn network_forward_with_header_rewrite() {
    let backend = MockServer::start().await;
    Mock::given(header("X-A", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("from upstream"))
        .mount(&backend)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(400))
        .mount(&backend)
        .await;

    let backend_uri: http::Uri = format!("http://{}", backend.address()).parse().unwrap();
    let routes = vec![route(
        "r",
        vec![],
        vec![FilterUse {
            name: "setRequestHeader".to_string(),
            args: vec![Value::Str("X-A".to_string()), Value::Str("1".to_string())],
        }],
        BackendSpec::Network(backend_uri),
    )];
    let harness = start_proxy(routes, HarnessConfig::default()).await;

    let resp = reqwest::get(format!("{}/x", harness.base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "from upstream");
}

/// Scenario 3: `a: Path("/a") -> setPath("/b") -> <loopback>; b: Path("/b") ->
/// status(200) -> inlineContent("B") -> <shunt>`.
#[tokio::test]
async fn loopback_chain() {
    let routes = vec![
        route(
            "a",
            vec![path_predicate("/a")],
            vec![FilterUse {
                name: "setPath".to_string(),
                args: vec![Value::Str("/b".to_string())],
            }],
            BackendSpec::Loopback,
        ),
        route(
            "b",
            vec![path_predicate("/b")],
            vec![status_filter(200), inline_content_filter("B")],
            BackendSpec::Shunt,
        ),
    ];
    let harness = start_proxy(routes, HarnessConfig::default()).await;

    let resp = reqwest::get(format!("{}/a", harness.base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "B");
}

/// Scenario 4: `r: * -> <loopback>` with `MaxLoopbacks=3` yields 500 after 3
/// iterations - no route ever breaks the cycle.
#[tokio::test]
async fn loop_exceeded_yields_500() {
    let routes = vec![route("r", vec![], vec![], BackendSpec::Loopback)];
    let harness = start_proxy(
        routes,
        HarnessConfig {
            max_loopbacks: 3,
            ..HarnessConfig::default()
        },
    )
    .await;

    let resp = reqwest::get(format!("{}/", harness.base_url)).await.unwrap();
    assert_eq!(resp.status(), 500);
}
