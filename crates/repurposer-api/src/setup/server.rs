//! Server startup and graceful shutdown.

use anyhow::Result;
use axum::Router;
use repurposer_core::PipelineConfig;
use repurposer_infra::RecoveryJobRunner;

/// Start the server with graceful shutdown.
pub async fn start_server(
    config: &PipelineConfig,
    app: Router,
    recovery: RecoveryJobRunner,
) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, environment = %config.environment, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(recovery))
        .await?;

    Ok(())
}

/// Listens for Ctrl+C (SIGINT) and SIGTERM to initiate graceful shutdown.
///
/// # Panics Panics if the Ctrl+C handler (or, on Unix, the SIGTERM handler)
/// cannot be installed — an unrecoverable system error.
async fn shutdown_signal(recovery: RecoveryJobRunner) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
    recovery.shutdown().await;
}
