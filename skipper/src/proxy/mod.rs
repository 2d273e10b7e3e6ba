//! The proxy lifecycle (C8): the `ProxyHttp` implementation pingora drives
//! per request, wired to the routing engine's published table.

pub mod context;
pub mod lifecycle;
pub mod upgrade;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pingora::prelude::HttpPeer;
use pingora_http::{RequestHeader, ResponseHeader};
use pingora_proxy::{ProxyHttp, Session};

use crate::endpoint::{EndpointRegistry, Outcome};
use crate::engine::RoutingEngine;

pub use context::FilterContext;
use lifecycle::LifecycleConfig;

/// Backend connection timeouts applied to every `HttpPeer` this proxy
/// builds, sourced from `skipper_config::Config`'s `*_backend` fields.
#[derive(Debug, Clone, Copy)]
pub struct PeerTimeouts {
    pub connection_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
}

/// Top-level `ProxyHttp` service: one per listener, shared across every
/// request it serves.
pub struct SkipperProxy {
    engine: Arc<RoutingEngine>,
    endpoint_registry: Arc<EndpointRegistry>,
    lifecycle: LifecycleConfig,
    timeouts: PeerTimeouts,
    experimental_upgrade: bool,
}

impl SkipperProxy {
    pub fn new(
        engine: Arc<RoutingEngine>,
        endpoint_registry: Arc<EndpointRegistry>,
        max_loopbacks: u32,
        default_http_status: u16,
        timeouts: PeerTimeouts,
        experimental_upgrade: bool,
    ) -> Self {
        Self {
            engine,
            endpoint_registry,
            lifecycle: LifecycleConfig {
                max_loopbacks,
                default_http_status,
            },
            timeouts,
            experimental_upgrade,
        }
    }
}

#[async_trait]
impl ProxyHttp for SkipperProxy {
    type CTX = FilterContext;

    fn new_ctx(&self) -> Self::CTX {
        FilterContext::new(self.engine.table(), self.endpoint_registry.clone())
    }

    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> pingora::Result<bool>
    where
        Self::CTX: Send + Sync,
    {
        lifecycle::run_request_phase(session, ctx, &self.lifecycle).await
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> pingora::Result<Box<HttpPeer>> {
        let resolved = ctx
            .resolved_peer
            .take()
            .ok_or_else(|| pingora::Error::new(pingora::ErrorType::HTTPStatus(502)))?;

        let mut peer = HttpPeer::new(resolved.address, resolved.tls, resolved.sni);
        peer.options.connection_timeout = Some(self.timeouts.connection_timeout);
        peer.options.read_timeout = Some(self.timeouts.read_timeout);
        peer.options.write_timeout = Some(self.timeouts.write_timeout);
        peer.options.idle_timeout = Some(self.timeouts.idle_timeout);
        Ok(Box::new(peer))
    }

    async fn upstream_request_filter(
        &self,
        session: &mut Session,
        header: &mut RequestHeader,
        ctx: &mut Self::CTX,
    ) -> pingora::Result<()> {
        let preserve_upgrade = self.experimental_upgrade && upgrade::is_upgrade_request(&header.headers);
        ctx.preserve_upgrade = preserve_upgrade;
        if !preserve_upgrade {
            lifecycle::strip_hop_by_hop(&mut header.headers);
        }

        if let Some(host) = &ctx.outgoing_host {
            header.insert_header("host", host)?;
        }

        let _ = session;
        Ok(())
    }

    fn upstream_response_filter(
        &self,
        session: &mut Session,
        upstream_response: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> pingora::Result<()> {
        ctx.upstream_status = Some(upstream_response.status().as_u16());
        lifecycle::run_response_phase(session, upstream_response, ctx)?;
        if !ctx.preserve_upgrade {
            lifecycle::strip_hop_by_hop(&mut upstream_response.headers);
        }
        Ok(())
    }

    /// Last hook pingora calls for every request, success or failure (spec.md
    /// §4.4's passive-health input and §4.7 step 6's access log). Reports the
    /// upstream outcome for whichever endpoint this exchange's
    /// `LoadBalanced` dispatch selected, releases its in-flight slot, and
    /// emits the access-log line.
    async fn logging(&self, _session: &mut Session, error: Option<&pingora::Error>, ctx: &mut Self::CTX)
    where
        Self::CTX: Send + Sync,
    {
        if let Some(guard) = ctx.in_flight.take() {
            let outcome = classify_outcome(ctx.upstream_status, error);
            guard.endpoint_state().record(outcome);
        }

        let status = ctx.upstream_status.or(ctx.response_status).unwrap_or(0);
        let latency_ms = ctx.started_at.elapsed().as_millis();
        let route_id = ctx.route_id.as_deref().unwrap_or("-");
        match error {
            Some(err) => tracing::warn!(route_id, status, latency_ms, %err, "request failed"),
            None => tracing::info!(route_id, status, latency_ms, "request completed"),
        }
    }
}

fn classify_outcome(status: Option<u16>, error: Option<&pingora::Error>) -> Outcome {
    if let Some(e) = error {
        return match e.etype {
            pingora::ErrorType::ConnectTimedout
            | pingora::ErrorType::ReadTimedout
            | pingora::ErrorType::WriteTimedout => Outcome::Timeout,
            _ => Outcome::NetworkError,
        };
    }
    match status {
        Some(code) if code >= 500 => Outcome::Http5xx,
        _ => Outcome::Success,
    }
}
