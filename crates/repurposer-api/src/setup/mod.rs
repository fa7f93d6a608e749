//! Application setup and initialization.
//!
//! Extracted from `main.rs` for testability: config validation,
//! database/service wiring, and route assembly each get their own module,
//! joined by one `initialize_app` entry point.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::setup::services::Services;
use anyhow::{Context, Result};
use repurposer_core::PipelineConfig;

/// Initialize the entire application: config validation, telemetry, database,
/// pipeline wiring, and the HTTP router.
pub async fn initialize_app(config: PipelineConfig) -> Result<(Services, axum::Router)> {
    config
        .validate()
        .context("configuration validation failed")?;

    repurposer_infra::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {e}"))?;

    tracing::info!("configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;
    let services = services::initialize_services(&config, pool).await?;
    let router = routes::setup_routes(&config, services.state.clone());

    Ok((services, router))
}
