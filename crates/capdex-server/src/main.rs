//! CAPDEX server binary
//!
//! Loads configuration, wires the runtime and serves the discovery API
//! until SIGINT/SIGTERM. The registry projection starts empty; the admin
//! surface (a separate deployment) hydrates it through its own channel.

use anyhow::Context;
use capdex_infrastructure::bootstrap::build_runtime;
use capdex_infrastructure::config::ConfigLoader;
use capdex_infrastructure::logging::init_logging;
use capdex_infrastructure::registry::RegistryStore;
use capdex_providers::events::RegistryEventBus;
use capdex_server::{app, AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = std::env::args().nth(1) {
        loader = loader.with_config_path(path);
    }
    let config = loader.load().context("failed to load configuration")?;

    init_logging(&config.logging).context("failed to initialize logging")?;

    let registry = Arc::new(RegistryStore::new(RegistryEventBus::new()));
    let runtime = build_runtime(config, registry)
        .await
        .context("failed to build runtime")?;

    let addr = format!(
        "{}:{}",
        runtime.config.server.host, runtime.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("capdex listening on {addr}");

    let router = app(AppState::from_runtime(&runtime));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("capdex shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut signal) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            signal.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
