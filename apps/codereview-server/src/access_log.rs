use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, MatchedPath};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{SecondsFormat, Utc};
use codereview_otel::ACCESS_TARGET;

fn first_forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(v) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        let ip = v.split(',').next().unwrap_or("").trim();
        if !ip.is_empty() {
            // strip port if present
            if let Some((host, _)) = ip.rsplit_once(':') {
                if host.chars().all(|c| c.is_ascii_digit() || c == '.') {
                    return Some(host.to_string());
                }
            }
            return Some(ip.to_string());
        }
    }
    let v = headers.get("forwarded").and_then(|h| h.to_str().ok())?;
    v.split(';')
        .flat_map(|s| s.split(','))
        .find_map(|part| part.trim().strip_prefix("for="))
        .map(|ip| ip.trim_matches('"').to_string())
}

fn remote_addr(req: &Request<axum::body::Body>, trust_forward: bool) -> Option<String> {
    let peer = || {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|c| c.0.ip().to_string())
    };
    if trust_forward {
        first_forwarded_ip(req.headers()).or_else(peer)
    } else {
        peer()
    }
}

/// One `http.access` event per request.
pub async fn access_log_mw(
    trust_forward: bool,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let remote = remote_addr(&req, trust_forward);
    let res = next.run(req).await;
    tracing::info!(
        target: ACCESS_TARGET,
        ts = %Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        method = method.as_str(),
        path = %path,
        status = res.status().as_u16(),
        dur_ms = started.elapsed().as_millis() as u64,
        remote = remote.as_deref().unwrap_or("-"),
        "access"
    );
    res
}
