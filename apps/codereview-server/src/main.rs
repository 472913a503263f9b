use std::{net::SocketAddr, time::Duration};

use anyhow::Context as _;
use tracing::{error, info, warn};

mod access_log;
mod api;
mod app_state;
mod bootstrap;
mod config;
mod http_client;
mod keepalive;
mod openapi;
mod responses;
mod router;
mod tasks;
#[cfg(test)]
mod test_support;

pub(crate) use app_state::AppState;

use config::ServerConfig;
use tasks::TaskManager;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    match bootstrap::ensure_openapi_export() {
        Ok(Some(_)) => return,
        Ok(None) => {}
        Err(err) => {
            eprintln!("error: failed to write generated OPENAPI_OUT: {err}");
            std::process::exit(2);
        }
    }

    // Before the subscriber so RUST_LOG from .env is honoured.
    let dotenv = dotenvy::dotenv();
    codereview_otel::init();
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded environment file");
    }

    let config = match ServerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(config).await {
        error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let bootstrap::BootstrapOutput { router, state } = bootstrap::build(&config)?;

    let addr = config.http.addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        %addr,
        backend = state.generator().backend(),
        instruction = state.instruction().as_str(),
        "codereview-server listening"
    );

    let mut background_tasks = TaskManager::new();
    background_tasks.extend(
        keepalive::start(&config.keepalive).context("failed to build keepalive client")?,
    );

    let served = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;
    if let Err(err) = &served {
        error!("http server exited with error: {err}");
    }

    info!(tasks = background_tasks.len(), "shutting down background tasks");
    background_tasks.shutdown_with_grace(SHUTDOWN_GRACE).await;
    served.context("http server")
}

async fn shutdown_signal() {
    info!("shutdown signal listener active");
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(%err, "SIGTERM handler unavailable; waiting for ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
