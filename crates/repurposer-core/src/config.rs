//! Configuration for the generation and post-sync pipeline.
//!
//! Every deployment-tunable value (lock expiry, staleness thresholds, the
//! fingerprint cache TTL and similarity threshold, post-fetch sizing, pacing
//! sleeps, task-queue knobs) is read from the environment here, with the same
//! `env::var(..).unwrap_or_else(default).parse.unwrap_or(default)` idiom the
//! rest of this workspace uses, and validated once at startup.

use std::env;

const LOCK_EXPIRY_HOURS: u64 = 6;
const STUCK_RUN_STALENESS_SECS: i64 = 900;
const FINGERPRINT_CACHE_TTL_SECS: u64 = 86_400;
const RECOVERY_EXPIRED_LOCK_INTERVAL_SECS: u64 = 900;
const RECOVERY_STUCK_RUN_INTERVAL_SECS: u64 = 300;
const SYNC_PACING_MIN_MS: u64 = 250;
const SYNC_PACING_MAX_MS: u64 = 1_500;
const TASK_QUEUE_MAX_WORKERS: usize = 4;
const TASK_QUEUE_POLL_INTERVAL_MS: u64 = 1_000;
const TASK_QUEUE_DEFAULT_TIMEOUT_SECS: i32 = 3_600;
const TASK_QUEUE_MAX_RETRIES: i32 = 3;
const TASK_QUEUE_STALE_TASK_REAP_INTERVAL_SECS: u64 = 60;
const TASK_QUEUE_STALE_TASK_GRACE_PERIOD_SECS: i64 = 300;
const DB_MAX_CONNECTIONS: u32 = 20;
const DB_TIMEOUT_SECONDS: u64 = 30;

/// Environment-driven configuration for the pipeline and the thin HTTP layer
/// that exposes it.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub environment: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,

    /// Expired-lock purge threshold.
    pub lock_expiry_hours: u64,
    /// Staleness threshold for the stuck-run fixer.
    pub stuck_run_staleness_secs: i64,
    pub recovery_expired_lock_interval_secs: u64,
    pub recovery_stuck_run_interval_secs: u64,

    /// Fingerprint cache TTL, "one day" by default.
    pub fingerprint_cache_ttl_secs: u64,
    /// Acceptance threshold for fingerprint similarity.
    pub fingerprint_similarity_threshold: f64,
    /// Multiplier / floor / ceiling on recent-post fetch size.
    pub post_fetch_multiplier: usize,
    pub post_fetch_floor: usize,
    pub post_fetch_ceiling: usize,
    /// Between-request pacing range, in milliseconds.
    pub sync_pacing_min_ms: u64,
    pub sync_pacing_max_ms: u64,

    /// Reuse cap for the main/TikTok video strategy and the slideshow
    /// main-account cap.
    pub video_reuse_window_generations: i32,
    pub video_popular_recent_window_days: i64,
    pub video_popular_recent_top_n: usize,
    pub video_popular_recent_min_pool: usize,
    pub video_never_generated_probability: f64,

    pub task_queue_max_workers: usize,
    pub task_queue_poll_interval_ms: u64,
    pub task_queue_default_timeout_seconds: i32,
    pub task_queue_max_retries: i32,
    pub task_queue_stale_task_reap_interval_secs: u64,
    pub task_queue_stale_task_grace_period_secs: i64,
}

impl PipelineConfig {
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = PipelineConfig {
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4100".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            database_url: env::var("REPURPOSER_DATABASE_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("REPURPOSER_DATABASE_URL or DATABASE_URL must be set")
                })?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| DB_TIMEOUT_SECONDS.to_string())
                .parse()
                .unwrap_or(DB_TIMEOUT_SECONDS),

            lock_expiry_hours: env::var("LOCK_EXPIRY_HOURS")
                .unwrap_or_else(|_| LOCK_EXPIRY_HOURS.to_string())
                .parse()
                .unwrap_or(LOCK_EXPIRY_HOURS),
            stuck_run_staleness_secs: env::var("STUCK_RUN_STALENESS_SECS")
                .unwrap_or_else(|_| STUCK_RUN_STALENESS_SECS.to_string())
                .parse()
                .unwrap_or(STUCK_RUN_STALENESS_SECS),
            recovery_expired_lock_interval_secs: env::var("RECOVERY_EXPIRED_LOCK_INTERVAL_SECS")
                .unwrap_or_else(|_| RECOVERY_EXPIRED_LOCK_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(RECOVERY_EXPIRED_LOCK_INTERVAL_SECS),
            recovery_stuck_run_interval_secs: env::var("RECOVERY_STUCK_RUN_INTERVAL_SECS")
                .unwrap_or_else(|_| RECOVERY_STUCK_RUN_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(RECOVERY_STUCK_RUN_INTERVAL_SECS),

            fingerprint_cache_ttl_secs: env::var("FINGERPRINT_CACHE_TTL_SECS")
                .unwrap_or_else(|_| FINGERPRINT_CACHE_TTL_SECS.to_string())
                .parse()
                .unwrap_or(FINGERPRINT_CACHE_TTL_SECS),
            fingerprint_similarity_threshold: env::var("FINGERPRINT_SIMILARITY_THRESHOLD")
                .unwrap_or_else(|_| crate::constants::FINGERPRINT_SIMILARITY_THRESHOLD.to_string())
                .parse()
                .unwrap_or(crate::constants::FINGERPRINT_SIMILARITY_THRESHOLD),
            post_fetch_multiplier: env::var("POST_FETCH_MULTIPLIER")
                .unwrap_or_else(|_| crate::constants::POST_FETCH_MULTIPLIER.to_string())
                .parse()
                .unwrap_or(crate::constants::POST_FETCH_MULTIPLIER),
            post_fetch_floor: env::var("POST_FETCH_FLOOR")
                .unwrap_or_else(|_| crate::constants::POST_FETCH_FLOOR.to_string())
                .parse()
                .unwrap_or(crate::constants::POST_FETCH_FLOOR),
            post_fetch_ceiling: env::var("POST_FETCH_CEILING")
                .unwrap_or_else(|_| crate::constants::POST_FETCH_CEILING.to_string())
                .parse()
                .unwrap_or(crate::constants::POST_FETCH_CEILING),
            sync_pacing_min_ms: env::var("SYNC_PACING_MIN_MS")
                .unwrap_or_else(|_| SYNC_PACING_MIN_MS.to_string())
                .parse()
                .unwrap_or(SYNC_PACING_MIN_MS),
            sync_pacing_max_ms: env::var("SYNC_PACING_MAX_MS")
                .unwrap_or_else(|_| SYNC_PACING_MAX_MS.to_string())
                .parse()
                .unwrap_or(SYNC_PACING_MAX_MS),

            video_reuse_window_generations: env::var("VIDEO_REUSE_WINDOW_GENERATIONS")
                .unwrap_or_else(|_| {
                    crate::constants::VIDEO_REUSE_WINDOW_GENERATIONS.to_string()
                })
                .parse()
                .unwrap_or(crate::constants::VIDEO_REUSE_WINDOW_GENERATIONS),
            video_popular_recent_window_days: env::var("VIDEO_POPULAR_RECENT_WINDOW_DAYS")
                .unwrap_or_else(|_| {
                    crate::constants::VIDEO_POPULAR_RECENT_WINDOW_DAYS.to_string()
                })
                .parse()
                .unwrap_or(crate::constants::VIDEO_POPULAR_RECENT_WINDOW_DAYS),
            video_popular_recent_top_n: env::var("VIDEO_POPULAR_RECENT_TOP_N")
                .unwrap_or_else(|_| crate::constants::VIDEO_POPULAR_RECENT_TOP_N.to_string())
                .parse()
                .unwrap_or(crate::constants::VIDEO_POPULAR_RECENT_TOP_N),
            video_popular_recent_min_pool: env::var("VIDEO_POPULAR_RECENT_MIN_POOL")
                .unwrap_or_else(|_| crate::constants::VIDEO_POPULAR_RECENT_MIN_POOL.to_string())
                .parse()
                .unwrap_or(crate::constants::VIDEO_POPULAR_RECENT_MIN_POOL),
            video_never_generated_probability: env::var("VIDEO_NEVER_GENERATED_PROBABILITY")
                .unwrap_or_else(|_| {
                    crate::constants::VIDEO_NEVER_GENERATED_PROBABILITY.to_string()
                })
                .parse()
                .unwrap_or(crate::constants::VIDEO_NEVER_GENERATED_PROBABILITY),

            task_queue_max_workers: env::var("TASK_QUEUE_MAX_WORKERS")
                .unwrap_or_else(|_| TASK_QUEUE_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_MAX_WORKERS),
            task_queue_poll_interval_ms: env::var("TASK_QUEUE_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| TASK_QUEUE_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_POLL_INTERVAL_MS),
            task_queue_default_timeout_seconds: env::var("TASK_QUEUE_DEFAULT_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| TASK_QUEUE_DEFAULT_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_DEFAULT_TIMEOUT_SECS),
            task_queue_max_retries: env::var("TASK_QUEUE_MAX_RETRIES")
                .unwrap_or_else(|_| TASK_QUEUE_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(TASK_QUEUE_MAX_RETRIES),
            task_queue_stale_task_reap_interval_secs: env::var(
                "TASK_QUEUE_STALE_TASK_REAP_INTERVAL_SECS",
            )
            .unwrap_or_else(|_| TASK_QUEUE_STALE_TASK_REAP_INTERVAL_SECS.to_string())
            .parse()
            .unwrap_or(TASK_QUEUE_STALE_TASK_REAP_INTERVAL_SECS),
            task_queue_stale_task_grace_period_secs: env::var(
                "TASK_QUEUE_STALE_TASK_GRACE_PERIOD_SECS",
            )
            .unwrap_or_else(|_| TASK_QUEUE_STALE_TASK_GRACE_PERIOD_SECS.to_string())
            .parse()
            .unwrap_or(TASK_QUEUE_STALE_TASK_GRACE_PERIOD_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.database_url.starts_with("postgresql://") && !self.database_url.starts_with("postgres://")
        {
            anyhow::bail!("REPURPOSER_DATABASE_URL must be a valid PostgreSQL connection string");
        }
        if !(0.0..=1.0).contains(&self.fingerprint_similarity_threshold) {
            anyhow::bail!("FINGERPRINT_SIMILARITY_THRESHOLD must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.video_never_generated_probability) {
            anyhow::bail!("VIDEO_NEVER_GENERATED_PROBABILITY must be in [0, 1]");
        }
        if self.post_fetch_floor > self.post_fetch_ceiling {
            anyhow::bail!("POST_FETCH_FLOOR must be <= POST_FETCH_CEILING");
        }
        if self.sync_pacing_min_ms > self.sync_pacing_max_ms {
            anyhow::bail!("SYNC_PACING_MIN_MS must be <= SYNC_PACING_MAX_MS");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> PipelineConfig {
        PipelineConfig {
            environment: "development".to_string(),
            server_port: 4100,
            database_url: "postgresql://localhost/repurposer".to_string(),
            db_max_connections: DB_MAX_CONNECTIONS,
            db_timeout_seconds: DB_TIMEOUT_SECONDS,
            lock_expiry_hours: LOCK_EXPIRY_HOURS,
            stuck_run_staleness_secs: STUCK_RUN_STALENESS_SECS,
            recovery_expired_lock_interval_secs: RECOVERY_EXPIRED_LOCK_INTERVAL_SECS,
            recovery_stuck_run_interval_secs: RECOVERY_STUCK_RUN_INTERVAL_SECS,
            fingerprint_cache_ttl_secs: FINGERPRINT_CACHE_TTL_SECS,
            fingerprint_similarity_threshold: crate::constants::FINGERPRINT_SIMILARITY_THRESHOLD,
            post_fetch_multiplier: crate::constants::POST_FETCH_MULTIPLIER,
            post_fetch_floor: crate::constants::POST_FETCH_FLOOR,
            post_fetch_ceiling: crate::constants::POST_FETCH_CEILING,
            sync_pacing_min_ms: SYNC_PACING_MIN_MS,
            sync_pacing_max_ms: SYNC_PACING_MAX_MS,
            video_reuse_window_generations: crate::constants::VIDEO_REUSE_WINDOW_GENERATIONS,
            video_popular_recent_window_days: crate::constants::VIDEO_POPULAR_RECENT_WINDOW_DAYS,
            video_popular_recent_top_n: crate::constants::VIDEO_POPULAR_RECENT_TOP_N,
            video_popular_recent_min_pool: crate::constants::VIDEO_POPULAR_RECENT_MIN_POOL,
            video_never_generated_probability:
                crate::constants::VIDEO_NEVER_GENERATED_PROBABILITY,
            task_queue_max_workers: TASK_QUEUE_MAX_WORKERS,
            task_queue_poll_interval_ms: TASK_QUEUE_POLL_INTERVAL_MS,
            task_queue_default_timeout_seconds: TASK_QUEUE_DEFAULT_TIMEOUT_SECS,
            task_queue_max_retries: TASK_QUEUE_MAX_RETRIES,
            task_queue_stale_task_reap_interval_secs: TASK_QUEUE_STALE_TASK_REAP_INTERVAL_SECS,
            task_queue_stale_task_grace_period_secs: TASK_QUEUE_STALE_TASK_GRACE_PERIOD_SECS,
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_non_postgres_url() {
        let mut cfg = base_config();
        cfg.database_url = "mysql://localhost/repurposer".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_similarity_threshold_out_of_range() {
        let mut cfg = base_config();
        cfg.fingerprint_similarity_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_post_fetch_bounds() {
        let mut cfg = base_config();
        cfg.post_fetch_floor = 60;
        cfg.post_fetch_ceiling = 50;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn is_production_matches_common_spellings() {
        let mut cfg = base_config();
        cfg.environment = "Production".to_string();
        assert!(cfg.is_production());
        cfg.environment = "prod".to_string();
        assert!(cfg.is_production());
        cfg.environment = "staging".to_string();
        assert!(!cfg.is_production());
    }
}
