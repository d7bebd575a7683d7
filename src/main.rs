use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;

use push_relay_service::config::Settings;
use push_relay_service::server::{create_app, AppState};
use push_relay_service::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing (kept alive until shutdown)
    let _telemetry = init_telemetry(&settings.logging, &settings.otel)?;
    tracing::info!(
        registry = %settings.registry.backend,
        transport = %settings.transport.kind,
        "Configuration loaded"
    );

    if settings.api.key.is_none() {
        tracing::warn!("api.key is not set; admin endpoints are unauthenticated");
    }

    // Create application state
    let state = AppState::new(settings.clone()).await?;
    tracing::info!(
        backend = state.store.backend_type(),
        transport = state.transport.name(),
        "Application state initialized"
    );

    let postgres_pool = state.postgres_pool.clone();

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler())
        .await?;

    if let Some(pool) = postgres_pool {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
