//! Configuration loader and validator for the shelfwatch daemon.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub app: App,
    pub push: Push,
}

/// App-level settings: storage location and scheduling knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct App {
    pub data_dir: String,
    /// Local wall-clock hours at which the expiration scan runs.
    pub scan_hours: Vec<u32>,
    /// Local wall-clock hour of the daily summary.
    pub summary_hour: u32,
    pub dedup_window_hours: i64,
    /// Exact remaining-day values that trigger a notification check.
    pub notify_threshold_days: Vec<i64>,
    pub waste_top_n: usize,
    pub default_shelf_life_days: i64,
    /// Bound on concurrent per-user scans within one tick.
    pub user_concurrency: usize,
}

/// Push endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Push {
    pub endpoint: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    pub fn dedup_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.app.dedup_window_hours)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.scan_hours.is_empty() {
        return Err(ConfigError::Invalid("app.scan_hours must be non-empty"));
    }
    if cfg.app.scan_hours.iter().any(|h| *h >= 24) {
        return Err(ConfigError::Invalid("app.scan_hours entries must be < 24"));
    }
    if cfg.app.summary_hour >= 24 {
        return Err(ConfigError::Invalid("app.summary_hour must be < 24"));
    }
    if cfg.app.dedup_window_hours <= 0 {
        return Err(ConfigError::Invalid("app.dedup_window_hours must be > 0"));
    }
    if cfg.app.notify_threshold_days.is_empty() {
        return Err(ConfigError::Invalid(
            "app.notify_threshold_days must be non-empty",
        ));
    }
    if cfg.app.waste_top_n == 0 {
        return Err(ConfigError::Invalid("app.waste_top_n must be > 0"));
    }
    if cfg.app.default_shelf_life_days <= 0 {
        return Err(ConfigError::Invalid(
            "app.default_shelf_life_days must be > 0",
        ));
    }
    if cfg.app.user_concurrency == 0 {
        return Err(ConfigError::Invalid("app.user_concurrency must be > 0"));
    }

    if cfg.push.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid("push.endpoint must be non-empty"));
    }

    Ok(())
}

/// Example YAML with the documented defaults.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  scan_hours: [8, 18]
  summary_hour: 20
  dedup_window_hours: 12
  notify_threshold_days: [3, 1, 0]
  waste_top_n: 5
  default_shelf_life_days: 30
  user_concurrency: 4

push:
  endpoint: "https://exp.host/--/api/v2/push/send"
  access_token: ""
"#
}
