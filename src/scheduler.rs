//! Fixed-cadence scan and summary jobs.
//!
//! Each trigger runs in its own sequential loop, so a tick can never
//! overlap the previous tick of the same trigger. Within a tick users are
//! scanned with bounded parallelism; items within a user are processed one
//! at a time so the read-decide-write on `last_notified_at` stays
//! serialized.

use anyhow::Result;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use futures::{stream, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::db::{self, Pool};
use crate::dispatch;
use crate::expiration::{classify_urgency, should_notify};
use crate::model::NotificationPayload;
use crate::push::{self, PushService};
use crate::trends;

/// Outcome counts for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub users: usize,
    pub dispatched: usize,
    pub failures: usize,
}

impl ScanStats {
    fn merge(&mut self, other: ScanStats) {
        self.users += other.users;
        self.dispatched += other.dispatched;
        self.failures += other.failures;
    }
}

/// Next local wall-clock instant at any of the given hours (minute zero).
pub fn next_fire(hours: &[u32], now: DateTime<Local>) -> DateTime<Local> {
    let mut best: Option<DateTime<Local>> = None;
    for &hour in hours {
        for day_offset in 0..2 {
            let date = now.date_naive() + Duration::days(day_offset);
            let naive = match date.and_hms_opt(hour, 0, 0) {
                Some(naive) => naive,
                None => continue,
            };
            let candidate = match Local.from_local_datetime(&naive).earliest() {
                Some(candidate) => candidate,
                None => continue,
            };
            if candidate > now && best.map(|b| candidate < b).unwrap_or(true) {
                best = Some(candidate);
            }
        }
    }
    // hours is validated non-empty with entries < 24, so tomorrow always
    // yields a candidate.
    best.unwrap_or(now + Duration::days(1))
}

/// Scan every user with a push destination and dispatch deduplicated
/// expiration alerts. Also invokable on demand with an explicit `now`.
#[instrument(skip_all)]
pub async fn run_expiration_scan(
    pool: &Pool,
    push: &dyn PushService,
    cfg: &Config,
    now: DateTime<Utc>,
) -> Result<ScanStats> {
    let user_ids = db::list_active_user_ids(pool).await?;
    let mut stats = ScanStats::default();
    let mut results = stream::iter(user_ids)
        .map(|user_id| async move {
            let per_user = scan_user_inventory(pool, push, cfg, &user_id, now).await;
            (user_id, per_user)
        })
        .buffer_unordered(cfg.app.user_concurrency);

    while let Some((user_id, result)) = results.next().await {
        match result {
            Ok(per_user) => stats.merge(per_user),
            Err(err) => {
                // One user's failure never aborts the rest of the scan.
                warn!(?err, user_id, "expiration scan failed for user");
                stats.failures += 1;
            }
        }
    }
    info!(
        users = stats.users,
        dispatched = stats.dispatched,
        failures = stats.failures,
        "expiration scan finished"
    );
    Ok(stats)
}

async fn scan_user_inventory(
    pool: &Pool,
    push: &dyn PushService,
    cfg: &Config,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<ScanStats> {
    let Some(token) = db::load_push_destination(pool, user_id).await? else {
        // No registered destination; nothing to dispatch for this user.
        return Ok(ScanStats::default());
    };

    let items = db::load_active_inventory(pool, user_id).await?;
    let mut stats = ScanStats {
        users: 1,
        ..Default::default()
    };
    for item in items {
        let urgency = classify_urgency(item.expiration_date, now);
        if !should_notify(
            urgency.days_remaining,
            item.last_notified_at,
            now,
            &cfg.app.notify_threshold_days,
            cfg.dedup_window(),
        ) {
            continue;
        }
        match dispatch::dispatch_expiration(pool, push, &token, &item, urgency.days_remaining, now)
            .await
        {
            Ok(true) => stats.dispatched += 1,
            Ok(false) => stats.failures += 1,
            Err(err) => {
                warn!(?err, item_id = %item.id, "item dispatch failed");
                stats.failures += 1;
            }
        }
    }
    Ok(stats)
}

/// Send each active user a summary of today's spending, nutrition and
/// soon-to-expire items.
#[instrument(skip_all)]
pub async fn run_daily_summary(
    pool: &Pool,
    push: &dyn PushService,
    cfg: &Config,
    now: DateTime<Utc>,
) -> Result<ScanStats> {
    let user_ids = db::list_active_user_ids(pool).await?;
    let mut stats = ScanStats::default();
    let mut results = stream::iter(user_ids)
        .map(|user_id| async move {
            let sent = summarize_user(pool, push, &user_id, now).await;
            (user_id, sent)
        })
        .buffer_unordered(cfg.app.user_concurrency);

    while let Some((user_id, result)) = results.next().await {
        match result {
            Ok(true) => {
                stats.users += 1;
                stats.dispatched += 1;
            }
            Ok(false) => {
                stats.users += 1;
                stats.failures += 1;
            }
            Err(err) => {
                warn!(?err, user_id, "daily summary failed for user");
                stats.failures += 1;
            }
        }
    }
    info!(
        users = stats.users,
        dispatched = stats.dispatched,
        failures = stats.failures,
        "daily summary finished"
    );
    Ok(stats)
}

async fn summarize_user(
    pool: &Pool,
    push: &dyn PushService,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(token) = db::load_push_destination(pool, user_id).await? else {
        return Ok(false);
    };

    let cutoff = now - Duration::days(2);
    let receipts = db::load_receipts_since(pool, user_id, cutoff).await?;
    let consumed = db::load_consumed_since(pool, user_id, cutoff).await?;
    let budget = db::load_daily_budget(pool, user_id).await?;
    // The summary fires on the local clock, so "today" is the local day.
    let summary = trends::today_summary(&receipts, &consumed, budget, now.with_timezone(&Local));

    let inventory = db::load_active_inventory(pool, user_id).await?;
    let expiring_soon = inventory
        .iter()
        .filter(|item| {
            let days = classify_urgency(item.expiration_date, now).days_remaining;
            (0..=3).contains(&days)
        })
        .count() as i64;

    let (title, body) = push::daily_summary_message(&summary, expiring_soon);
    let payload = NotificationPayload::DailySummary {
        spent_today: summary.spent_today,
        calories_today: summary.calories_today,
        expiring_soon,
    };
    dispatch::dispatch(pool, push, user_id, &token, title, body, payload, now).await
}

/// Spawn the two trigger loops. Each loop sleeps until its next wall-clock
/// fire time, runs the job to completion, and only then schedules the next
/// tick.
pub fn spawn_loops(pool: Pool, push: Arc<dyn PushService>, cfg: Config) -> Vec<JoinHandle<()>> {
    let scan_pool = pool.clone();
    let scan_push = push.clone();
    let scan_cfg = cfg.clone();
    let scan = tokio::spawn(async move {
        loop {
            sleep_until_fire(&scan_cfg.app.scan_hours).await;
            if let Err(err) =
                run_expiration_scan(&scan_pool, scan_push.as_ref(), &scan_cfg, Utc::now()).await
            {
                error!(?err, "expiration scan tick failed");
            }
        }
    });

    let summary = tokio::spawn(async move {
        let hours = [cfg.app.summary_hour];
        loop {
            sleep_until_fire(&hours).await;
            if let Err(err) = run_daily_summary(&pool, push.as_ref(), &cfg, Utc::now()).await {
                error!(?err, "daily summary tick failed");
            }
        }
    });

    vec![scan, summary]
}

async fn sleep_until_fire(hours: &[u32]) {
    let now = Local::now();
    let next = next_fire(hours, now);
    let wait = (next - now)
        .to_std()
        .unwrap_or_else(|_| std::time::Duration::from_secs(1));
    info!(next = %next, "sleeping until next tick");
    tokio::time::sleep(wait).await;
}
