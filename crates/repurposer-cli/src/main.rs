//! Ops CLI for the pipeline. A handful of subcommands that operate directly
//! against the database, bypassing the HTTP API: trigger recovery jobs out
//! of band, inspect a run, and list outstanding locks.

use anyhow::Context;
use clap::{Parser, Subcommand};
use repurposer_cli::init_tracing;
use repurposer_core::models::ContentType;
use repurposer_core::PipelineConfig;
use repurposer_db::{LockRepository, RunRepository};
use repurposer_pipeline::{LockRegistry, RecoveryScheduler, RunTracker};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "repurposer-cli", about = "Ops CLI for the content pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trigger a recovery job out of band.
    Recover {
        #[command(subcommand)]
        job: RecoverJob,
    },
    /// Inspect generation runs for an account.
    Status {
        #[command(subcommand)]
        query: StatusQuery,
    },
    /// List outstanding generation locks.
    Locks,
}

#[derive(Subcommand)]
enum RecoverJob {
    /// Delete locks whose owning run no longer references them.
    OrphanedLocks,
    /// Delete locks older than the configured expiry, unconditionally.
    ExpiredLocks,
    /// Drain counters on runs stale past the configured staleness window.
    StuckRuns,
}

#[derive(Subcommand)]
enum StatusQuery {
    /// The currently active run, if any.
    Active {
        account_id: Uuid,
        content_type: ContentType,
    },
    /// The most recent run regardless of status.
    Latest {
        account_id: Uuid,
        content_type: ContentType,
    },
    /// Past runs for an account, across all content types.
    History {
        account_id: Uuid,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env().context("loading configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;

    let locks = LockRegistry::new(LockRepository::new(pool.clone()));
    let runs = RunTracker::new(
        RunRepository::new(pool.clone()),
        LockRepository::new(pool.clone()),
    );

    match cli.command {
        Command::Recover { job } => {
            let scheduler = RecoveryScheduler::new(locks, runs, config);
            match job {
                RecoverJob::OrphanedLocks => {
                    let deleted = scheduler.purge_orphaned_locks().await?;
                    println!("purged {deleted} orphaned lock(s)");
                }
                RecoverJob::ExpiredLocks => {
                    let deleted = scheduler.purge_expired_locks().await?;
                    println!("purged {deleted} expired lock(s)");
                }
                RecoverJob::StuckRuns => {
                    let fixed = scheduler.fix_stuck_runs().await?;
                    println!("repaired {fixed} stuck run(s)");
                }
            }
        }
        Command::Status { query } => match query {
            StatusQuery::Active {
                account_id,
                content_type,
            } => match runs.get_active(account_id, content_type).await? {
                Some(status) => print_status(&status),
                None => println!("no active run for {account_id} / {content_type}"),
            },
            StatusQuery::Latest {
                account_id,
                content_type,
            } => match runs.get_latest(account_id, content_type).await? {
                Some(status) => print_status(&status),
                None => println!("no runs for {account_id} / {content_type}"),
            },
            StatusQuery::History { account_id, limit } => {
                let history = runs.get_history(account_id, limit).await?;
                if history.is_empty() {
                    println!("no runs for {account_id}");
                }
                for status in &history {
                    print_status(status);
                }
            }
        },
        Command::Locks => {
            let all = locks.list_all().await?;
            if all.is_empty() {
                println!("no outstanding locks");
            }
            for lock in &all {
                println!(
                    "{} account={} content_type={} locked_at={}",
                    lock.lock_id, lock.account_id, lock.content_type, lock.locked_at
                );
            }
        }
    }

    Ok(())
}

fn print_status(status: &repurposer_core::models::AccountGenerationStatus) {
    println!(
        "run={} account={} content_type={} status={:?} requested={} queued={} processing={} completed={} failed={}",
        status.id,
        status.account_id,
        status.content_type,
        status.status,
        status.total_requested,
        status.total_queued,
        status.total_processing,
        status.total_completed,
        status.total_failed,
    );
    if let Some(code) = &status.error_code {
        println!(
            "  error_code={code} error_message={:?}",
            status.error_message
        );
    }
}
