use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use codereview_genai::{GeminiClient, Generator};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};
use utoipa::OpenApi;

use crate::config::{HttpConfig, ServerConfig};
use crate::{access_log, router, AppState};

pub(crate) struct BootstrapOutput {
    pub router: axum::Router<()>,
    pub state: AppState,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum BootstrapError {
    #[error("failed to build generation client: {0}")]
    Client(#[from] reqwest::Error),
}

pub(crate) fn build(config: &ServerConfig) -> Result<BootstrapOutput, BootstrapError> {
    let client = GeminiClient::new(config.gemini.clone())?;
    info!(
        target: "codereview::bootstrap",
        model = client.model(),
        endpoint = client.endpoint(),
        "generation client ready"
    );
    Ok(build_with_generator(config, Arc::new(client)))
}

pub(crate) fn build_with_generator(
    config: &ServerConfig,
    generator: Arc<dyn Generator>,
) -> BootstrapOutput {
    let (router, endpoints, endpoints_meta) = router::build_router();
    let state = AppState::builder(generator)
        .with_instruction(config.instruction)
        .with_bind(config.http.addr)
        .with_endpoints(Arc::new(endpoints))
        .with_endpoints_meta(Arc::new(endpoints_meta))
        .build();
    let router = router.with_state::<()>(state.clone());
    let router = attach_http_layers(router, &config.http);
    let router = attach_global_layers(router, &config.http);
    BootstrapOutput { router, state }
}

pub(crate) fn attach_http_layers(router: axum::Router<()>, http: &HttpConfig) -> axum::Router<()> {
    use tower::limit::ConcurrencyLimitLayer;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(http.concurrency_limit))
        .layer(cors_layer(http.cors_origins.as_deref()))
}

pub(crate) fn attach_global_layers(router: axum::Router<()>, http: &HttpConfig) -> axum::Router<()> {
    if !http.access_log {
        return router;
    }
    let trust_forward = http.trust_forward;
    router.layer(axum::middleware::from_fn(move |req, next| {
        access_log::access_log_mw(trust_forward, req, next)
    }))
}

/// Any origin when `origins` is `None`; otherwise only the listed ones.
fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    match origins {
        None => layer.allow_origin(Any),
        Some(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(target: "codereview::bootstrap", origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}

pub(crate) fn ensure_openapi_export() -> Result<Option<String>, std::io::Error> {
    if let Ok(path) = std::env::var("OPENAPI_OUT") {
        export_openapi(&path)?;
        return Ok(Some(path));
    }
    Ok(None)
}

fn export_openapi(path: &str) -> Result<(), std::io::Error> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = crate::openapi::ApiDoc::openapi()
        .to_yaml()
        .map_err(std::io::Error::other)?;
    std::fs::write(path, yaml)
}
