use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use shelfwatch::config;
use shelfwatch::db;
use shelfwatch::push::{ExpoPushClient, PushService};
use shelfwatch::scheduler;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
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

    let push: Arc<dyn PushService> = Arc::new(ExpoPushClient::from_config(&cfg)?);

    info!(
        scan_hours = ?cfg.app.scan_hours,
        summary_hour = cfg.app.summary_hour,
        "starting shelfwatch scheduler"
    );
    let loops = scheduler::spawn_loops(pool, push, cfg);

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, abandoning in-flight ticks");
    for handle in loops {
        handle.abort();
    }
    Ok(())
}
