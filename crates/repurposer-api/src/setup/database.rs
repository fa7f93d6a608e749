//! Database connection pool setup and migration.

use anyhow::Result;
use repurposer_core::PipelineConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Connects the Postgres pool. Schema migration is not this crate's concern —
/// the pool assumes the tables named/ already exist.
pub async fn setup_database(config: &PipelineConfig) -> Result<PgPool> {
    tracing::info!("connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    tracing::info!(max_connections = config.db_max_connections, "database connected");

    Ok(pool)
}
