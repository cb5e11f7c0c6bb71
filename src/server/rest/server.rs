use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::server::rest::create_router;
use crate::shared::config::ManagerConfig;
use crate::shared::initialize_app_state;

pub async fn run_rest_server(config: &ManagerConfig, host: &str, port: u16) -> Result<()> {
    info!("Starting OctoPrint manager REST API service...");

    let app_state = Arc::new(initialize_app_state(config).await?);

    info!("Ensuring image {} is present...", config.image);
    app_state
        .lifecycle
        .ensure_image()
        .await
        .context("Base image is required before any container can run")?;

    info!("Reconciling recorded containers...");
    let report = app_state
        .lifecycle
        .reconcile_all()
        .await
        .context("Failed to read containers for reconciliation")?;
    for failure in &report.failures {
        warn!("Container {} did not converge: {}", failure.id, failure.error);
    }
    for row in &report.invalid {
        warn!("Container row {} is unreadable: {}", row.id, row.error);
    }

    info!("Building REST API routes...");
    let app = create_router(app_state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("REST API listening on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("REST API stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}
