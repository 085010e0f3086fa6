use anyhow::Result;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use shelfwatch::config;
use shelfwatch::db;
use shelfwatch::push::ExpoPushClient;
use shelfwatch::scheduler;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Job {
    /// Expiration scan over all users with a push destination
    Scan,
    /// Daily spending/nutrition summary
    Summary,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Run one scan or summary tick immediately and exit")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Which job to run
    #[arg(long, value_enum, default_value = "scan")]
    job: Job,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/shelfwatch.db", cfg.app.data_dir));

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let push = ExpoPushClient::from_config(&cfg)?;
    let now = Utc::now();

    let stats = match args.job {
        Job::Scan => scheduler::run_expiration_scan(&pool, &push, &cfg, now).await?,
        Job::Summary => scheduler::run_daily_summary(&pool, &push, &cfg, now).await?,
    };
    info!(
        users = stats.users,
        dispatched = stats.dispatched,
        failures = stats.failures,
        "tick complete"
    );
    Ok(())
}
