//! The request lifecycle (C8): match, run request-phase filters, dispatch
//! to a backend, looping on `<loopback>` - all inside one `request_filter`
//! call, since pingora only invokes `upstream_peer` once `request_filter`
//! returns `Ok(false)` (spec.md §4.7).

use bytes::Bytes;
use pingora_http::ResponseHeader;
use pingora_proxy::Session;

use crate::balancer::SelectionKey;
use crate::route::{Backend, EndpointScheme, FilterInstance, RequestInfo};

use super::context::{FilterContext, ResolvedPeer};

/// Tunables the lifecycle needs that don't belong on a per-request context.
pub struct LifecycleConfig {
    pub max_loopbacks: u32,
    pub default_http_status: u16,
}

/// Runs the request phase: match, filter chain, backend dispatch, looping
/// on `<loopback>`. Returns `Ok(true)` when the exchange is already served
/// (shunt, filter-produced response, or an error status) and `Ok(false)`
/// when `ctx.resolved_peer` is set and pingora should proceed to
/// `upstream_peer`.
pub async fn run_request_phase(
    session: &mut Session,
    ctx: &mut FilterContext,
    config: &LifecycleConfig,
) -> pingora::Result<bool> {
    loop {
        let table = ctx.table.clone();
        let req = request_info(session);
        let matched = table.match_request(&req);

        let Some((route, params)) = matched else {
            respond(session, config.default_http_status, None).await?;
            return Ok(true);
        };

        ctx.route_id = Some(route.id.clone());
        ctx.path_params = params;

        let mut ran = 0usize;
        for instance in &route.filters {
            match instance.filter.request(session, ctx).await {
                Ok(true) => {
                    ran += 1;
                    ctx.served = true;
                    break;
                }
                Ok(false) => ran += 1,
                Err(err) => return Err(err),
            }
        }

        // A filter (e.g. a rejected scheduler admission) served the
        // exchange itself. Every filter whose request phase ran, including
        // the one that served it, still gets its response phase: spec.md
        // §4.7's filter chains run request and response phases in matched
        // multisets, not just on the success path.
        if ctx.served {
            finish_served(session, ctx, &route.filters[..ran], config).await?;
            return Ok(true);
        }

        match &route.backend {
            Backend::Shunt => {
                ctx.served = true;
                finish_served(session, ctx, &route.filters[..ran], config).await?;
                return Ok(true);
            }
            Backend::Loopback => {
                ctx.loop_count += 1;
                if ctx.loop_count > config.max_loopbacks {
                    session.downstream_session.respond_error(500).await?;
                    return Ok(true);
                }
                continue;
            }
            Backend::Network(uri) => {
                ctx.resolved_peer = Some(resolved_peer_from_uri(uri, ctx.outgoing_host.clone()));
                return Ok(false);
            }
            Backend::Dynamic => {
                let target = match ctx.get_state("dynamic_target").and_then(|v| match v {
                    super::context::StateValue::Str(s) => s.parse::<http::Uri>().ok(),
                    _ => None,
                }) {
                    Some(uri) => uri,
                    None => {
                        session.downstream_session.respond_error(502).await?;
                        return Ok(true);
                    }
                };
                ctx.resolved_peer = Some(resolved_peer_from_uri(&target, ctx.outgoing_host.clone()));
                return Ok(false);
            }
            Backend::LoadBalanced(lb) => {
                let path = req.uri.path().to_string();
                let key = SelectionKey {
                    client_addr: req.client_addr.map(|addr| addr.ip()),
                    path: &path,
                };
                let idx = lb.balancer.select(&lb.endpoints, &ctx.endpoint_registry, &key);
                let descriptor = &lb.endpoints[idx];
                let state = ctx.endpoint_registry.get_or_create(descriptor);
                ctx.in_flight = Some(state.acquire());
                ctx.resolved_peer = Some(ResolvedPeer {
                    address: format!("{}:{}", descriptor.host, descriptor.port),
                    tls: matches!(descriptor.scheme, EndpointScheme::Https),
                    sni: descriptor.host.clone(),
                });
                return Ok(false);
            }
        }
    }
}

/// Runs the response phase in reverse declaration order for the route that
/// served this exchange (spec.md §4.7 step 6). A no-op if no route matched
/// (e.g. the default-status response was synthesized before any route was
/// selected).
pub fn run_response_phase(
    session: &mut Session,
    response: &mut ResponseHeader,
    ctx: &mut FilterContext,
) -> pingora::Result<()> {
    let Some(route_id) = ctx.route_id.clone() else {
        return Ok(());
    };
    let table = ctx.table.clone();
    let Some(route) = table.routes().iter().find(|r| r.id == route_id) else {
        return Ok(());
    };
    for instance in route.filters.iter().rev() {
        instance.filter.response(session, response, ctx)?;
    }
    Ok(())
}

fn resolved_peer_from_uri(uri: &http::Uri, outgoing_host: Option<String>) -> ResolvedPeer {
    let tls = uri.scheme_str() == Some("https");
    let host = uri.host().unwrap_or_default();
    let port = uri.port_u16().unwrap_or(if tls { 443 } else { 80 });
    ResolvedPeer {
        address: format!("{host}:{port}"),
        tls,
        sni: outgoing_host.unwrap_or_else(|| host.to_string()),
    }
}

fn request_info<'a>(session: &'a Session) -> RequestInfo<'a> {
    let header = session.req_header();
    RequestInfo {
        method: &header.method,
        uri: &header.uri,
        headers: &header.headers,
        client_addr: session.client_addr().and_then(|addr| addr.as_inet()).copied(),
    }
}

async fn respond(session: &mut Session, status: u16, body: Option<Bytes>) -> pingora::Result<()> {
    let code = http::StatusCode::from_u16(status).unwrap_or(http::StatusCode::NOT_FOUND);
    let response = ResponseHeader::build(code, Some(1))?;
    session
        .downstream_session
        .write_response_header(Box::new(response))
        .await?;
    session
        .downstream_session
        .write_response_body(body.unwrap_or_default(), true)
        .await?;
    Ok(())
}

/// Builds and writes the response for an exchange served without reaching
/// an upstream (`<shunt>`, or a filter that rejected the request), running
/// the response phase in reverse order over exactly the filters whose
/// request phase ran this iteration first, so `status(...)`/`inlineContent`
/// and friends can still shape the outcome.
async fn finish_served(
    session: &mut Session,
    ctx: &mut FilterContext,
    filters: &[FilterInstance],
    config: &LifecycleConfig,
) -> pingora::Result<()> {
    let status = ctx.response_status.unwrap_or(config.default_http_status);
    let code = http::StatusCode::from_u16(status).unwrap_or(http::StatusCode::NOT_FOUND);
    let mut response = ResponseHeader::build(code, Some(1))?;
    for instance in filters.iter().rev() {
        instance.filter.response(session, &mut response, ctx)?;
    }
    let body = ctx.response_body.clone().unwrap_or_default();
    session
        .downstream_session
        .write_response_header(Box::new(response))
        .await?;
    session.downstream_session.write_response_body(body, true).await?;
    Ok(())
}

/// Headers that never travel across a hop (RFC 7230 §6.1), plus whatever
/// the incoming `Connection` header names.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Strips hop-by-hop headers from `headers` in place (spec.md §4.7 step 5).
pub fn strip_hop_by_hop(headers: &mut http::HeaderMap) {
    let mut extra: Vec<String> = Vec::new();
    if let Some(connection) = headers.get(http::header::CONNECTION) {
        if let Ok(value) = connection.to_str() {
            extra.extend(value.split(',').map(|s| s.trim().to_lowercase()));
        }
    }

    for name in HOP_BY_HOP.iter().map(|s| s.to_string()).chain(extra) {
        headers.remove(name.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_hop_by_hop_removes_standard_and_named_headers() {
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::CONNECTION, "keep-alive, X-Custom".parse().unwrap());
        headers.insert("keep-alive", "timeout=5".parse().unwrap());
        headers.insert("x-custom", "value".parse().unwrap());
        headers.insert("content-type", "text/plain".parse().unwrap());

        strip_hop_by_hop(&mut headers);

        assert!(!headers.contains_key(http::header::CONNECTION));
        assert!(!headers.contains_key("keep-alive"));
        assert!(!headers.contains_key("x-custom"));
        assert!(headers.contains_key("content-type"));
    }
}
