use case_portal::config::get_configuration;
use case_portal::services::{metrics::init_metrics, BackendClient};
use case_portal::session::SessionCookies;
use case_portal::startup::build_router;
use case_portal::AppState;
use dotenvy::dotenv;
use portal_core::observability::logging::init_tracing;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        &configuration.telemetry.service_name,
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    )?;

    let metrics = init_metrics()?;

    let backend = BackendClient::new(configuration.backend.clone())
        .map_err(|e| anyhow::anyhow!("Failed to build backend client: {}", e))?;
    info!(backend_url = %backend.base_url(), "Hosted backend client ready");

    let cookies = SessionCookies::new(configuration.server.environment.is_production());
    let state = AppState::with_backend(
        Arc::new(backend),
        cookies,
        configuration.gate.call_timeout(),
        configuration.server.public_url.clone(),
        metrics,
    );

    let app = build_router(state);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting case-portal on {}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
