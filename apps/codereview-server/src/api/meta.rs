use axum::response::IntoResponse;
use axum::{extract::State, Json};
use serde_json::json;

use crate::AppState;

pub(crate) const GREETING: &str = "Hello, AI!";

/// Plain-text greeting; doubles as the keepalive target.
#[utoipa::path(
    get,
    path = "/",
    tag = "Meta",
    responses(
        (status = 200, description = "Greeting", body = String, content_type = "text/plain")
    )
)]
pub async fn root() -> &'static str {
    GREETING
}

/// Health probe.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Meta",
    responses(
        (status = 200, description = "Service healthy", body = crate::openapi::HealthOk)
    )
)]
pub async fn healthz() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

/// Service metadata and endpoints index.
#[utoipa::path(
    get,
    path = "/about",
    tag = "Meta",
    responses(
        (status = 200, description = "Service metadata", body = crate::openapi::AboutResponse)
    )
)]
pub async fn about(State(state): State<AppState>) -> impl IntoResponse {
    let endpoints = state.endpoints();
    let bind = state.bind();
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "http": {"bind": bind.ip().to_string(), "port": bind.port()},
        "generation": {
            "backend": state.generator().backend(),
            "instruction": state.instruction().as_str(),
        },
        "counts": {"total": endpoints.len()},
        "endpoints": endpoints.as_ref(),
        "endpoints_meta": state.endpoints_meta().as_ref(),
    }))
}
