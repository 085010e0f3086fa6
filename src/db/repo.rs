use super::model::{NewInventoryItem, NewReceipt};
use crate::model::{FoodCategory, InventoryItem, NotificationPayload, NotificationRecord, Receipt};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{instrument, warn};
use uuid::Uuid;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, make sure the parent directory exists.
/// In-memory URLs and non-sqlite schemes pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }
    let path = url["sqlite:".len()..].trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    url.to_string()
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a stored timestamp. Accepts RFC 3339 and SQLite's own
/// `datetime('now')` format.
fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

// ---- users & push destinations ----

#[instrument(skip_all)]
pub async fn get_or_create_user(pool: &Pool, user_id: &str) -> Result<()> {
    sqlx::query("INSERT INTO users (id) VALUES (?) ON CONFLICT(id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn save_push_token(pool: &Pool, user_id: &str, token: &str) -> Result<()> {
    get_or_create_user(pool, user_id).await?;
    sqlx::query("UPDATE users SET push_token = ?, updated_at = ? WHERE id = ?")
        .bind(token)
        .bind(format_ts(Utc::now()))
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn load_push_destination(pool: &Pool, user_id: &str) -> Result<Option<String>> {
    let token: Option<Option<String>> =
        sqlx::query_scalar("SELECT push_token FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(token.flatten().filter(|t| !t.trim().is_empty()))
}

/// Users eligible for batch scans: anyone with a registered push
/// destination. This is the explicit per-user iteration contract the
/// schedulers fan out over.
#[instrument(skip_all)]
pub async fn list_active_user_ids(pool: &Pool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar(
        "SELECT id FROM users WHERE push_token IS NOT NULL AND push_token != '' ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

#[instrument(skip_all)]
pub async fn set_daily_budget(pool: &Pool, user_id: &str, budget: f64) -> Result<()> {
    get_or_create_user(pool, user_id).await?;
    sqlx::query("UPDATE users SET daily_budget = ? WHERE id = ?")
        .bind(budget)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn load_daily_budget(pool: &Pool, user_id: &str) -> Result<f64> {
    let budget: Option<f64> = sqlx::query_scalar("SELECT daily_budget FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(budget.unwrap_or(0.0))
}

// ---- inventory ----

#[instrument(skip_all)]
pub async fn insert_inventory_item(pool: &Pool, item: &NewInventoryItem) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO inventory_items \
         (id, user_id, name, category, quantity, unit, purchase_date, expiration_date, \
          calories, protein, receipt_id, consumed) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
    )
    .bind(&id)
    .bind(&item.user_id)
    .bind(&item.name)
    .bind(item.category.as_str())
    .bind(item.quantity)
    .bind(&item.unit)
    .bind(format_ts(item.purchase_date))
    .bind(format_ts(item.expiration_date))
    .bind(item.calories)
    .bind(item.protein)
    .bind(&item.receipt_id)
    .execute(pool)
    .await?;
    Ok(id)
}

fn item_from_row(row: &SqliteRow) -> Option<InventoryItem> {
    let id: String = row.get("id");
    let purchase_raw: String = row.get("purchase_date");
    let expiration_raw: String = row.get("expiration_date");
    let Some(purchase_date) = parse_ts(&purchase_raw) else {
        warn!(item_id = %id, raw = %purchase_raw, "skipping item with malformed purchase_date");
        return None;
    };
    let Some(expiration_date) = parse_ts(&expiration_raw) else {
        warn!(item_id = %id, raw = %expiration_raw, "skipping item with malformed expiration_date");
        return None;
    };

    let category_raw: String = row.get("category");
    let category = FoodCategory::parse(&category_raw).unwrap_or(FoodCategory::Other);

    let consumed_date = row
        .try_get::<Option<String>, _>("consumed_date")
        .ok()
        .flatten()
        .and_then(|raw| parse_ts(&raw));
    let last_notified_at = row
        .try_get::<Option<String>, _>("last_notified_at")
        .ok()
        .flatten()
        .and_then(|raw| parse_ts(&raw));

    Some(InventoryItem {
        id,
        user_id: row.get("user_id"),
        name: row.get("name"),
        category,
        quantity: row.get("quantity"),
        unit: row.get("unit"),
        purchase_date,
        expiration_date,
        calories: row.try_get("calories").ok(),
        protein: row.try_get("protein").ok(),
        receipt_id: row.try_get::<Option<String>, _>("receipt_id").ok().flatten(),
        consumed: row.get::<i64, _>("consumed") != 0,
        consumed_date,
        last_notified_at,
    })
}

/// Unconsumed inventory for one user, soonest expiration first. Rows with
/// malformed timestamps are skipped with a warning, never fatal.
#[instrument(skip_all)]
pub async fn load_active_inventory(pool: &Pool, user_id: &str) -> Result<Vec<InventoryItem>> {
    let rows = sqlx::query(
        "SELECT * FROM inventory_items WHERE user_id = ? AND consumed = 0 ORDER BY expiration_date",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().filter_map(item_from_row).collect())
}

/// Full inventory snapshot (consumed included), used by waste statistics.
#[instrument(skip_all)]
pub async fn load_inventory(pool: &Pool, user_id: &str) -> Result<Vec<InventoryItem>> {
    let rows = sqlx::query("SELECT * FROM inventory_items WHERE user_id = ? ORDER BY purchase_date")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().filter_map(item_from_row).collect())
}

/// Items consumed at or after `cutoff`, feeding the calorie trend.
#[instrument(skip_all)]
pub async fn load_consumed_since(
    pool: &Pool,
    user_id: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<InventoryItem>> {
    let rows = sqlx::query(
        "SELECT * FROM inventory_items \
         WHERE user_id = ? AND consumed = 1 AND consumed_date >= ? \
         ORDER BY consumed_date",
    )
    .bind(user_id)
    .bind(format_ts(cutoff))
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().filter_map(item_from_row).collect())
}

#[instrument(skip_all)]
pub async fn mark_item_consumed(pool: &Pool, item_id: &str, at: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE inventory_items SET consumed = 1, consumed_date = ? WHERE id = ?")
        .bind(format_ts(at))
        .bind(item_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Notification bookkeeping; the only inventory field the scheduler writes.
#[instrument(skip_all)]
pub async fn update_last_notified(pool: &Pool, item_id: &str, at: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE inventory_items SET last_notified_at = ? WHERE id = ?")
        .bind(format_ts(at))
        .bind(item_id)
        .execute(pool)
        .await
        .context("failed to persist last_notified_at")?;
    Ok(())
}

// ---- receipts ----

#[instrument(skip_all)]
pub async fn insert_receipt(pool: &Pool, receipt: &NewReceipt) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO receipts (id, user_id, store_name, purchase_date, total_amount) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&receipt.user_id)
    .bind(&receipt.store_name)
    .bind(format_ts(receipt.purchase_date))
    .bind(receipt.total_amount)
    .execute(pool)
    .await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn load_receipts_since(
    pool: &Pool,
    user_id: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Receipt>> {
    let rows = sqlx::query(
        "SELECT id, user_id, store_name, purchase_date, total_amount FROM receipts \
         WHERE user_id = ? AND purchase_date >= ? ORDER BY purchase_date",
    )
    .bind(user_id)
    .bind(format_ts(cutoff))
    .fetch_all(pool)
    .await?;

    let receipts = rows
        .iter()
        .filter_map(|row| {
            let id: String = row.get("id");
            let raw: String = row.get("purchase_date");
            let Some(purchase_date) = parse_ts(&raw) else {
                warn!(receipt_id = %id, raw = %raw, "skipping receipt with malformed purchase_date");
                return None;
            };
            Some(Receipt {
                id,
                user_id: row.get("user_id"),
                store_name: row.try_get::<Option<String>, _>("store_name").ok().flatten(),
                purchase_date,
                total_amount: row.get("total_amount"),
            })
        })
        .collect();
    Ok(receipts)
}

// ---- notifications ----

/// Append one notification record. Records are immutable apart from the
/// read flag.
#[instrument(skip_all)]
pub async fn append_notification_record(pool: &Pool, record: &NotificationRecord) -> Result<()> {
    let payload =
        serde_json::to_string(&record.payload).context("failed to encode notification payload")?;
    sqlx::query(
        "INSERT INTO notifications (id, user_id, kind, title, body, payload, read, sent_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(&record.kind)
    .bind(&record.title)
    .bind(&record.body)
    .bind(payload)
    .bind(record.read as i64)
    .bind(format_ts(record.sent_at))
    .execute(pool)
    .await?;
    Ok(())
}

/// Idempotent: flipping an already-read record is a no-op.
#[instrument(skip_all)]
pub async fn mark_notification_read(pool: &Pool, notification_id: &str) -> Result<()> {
    sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?")
        .bind(notification_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn list_notifications(
    pool: &Pool,
    user_id: &str,
    unread_only: bool,
    limit: i64,
) -> Result<Vec<NotificationRecord>> {
    let sql = if unread_only {
        "SELECT * FROM notifications WHERE user_id = ? AND read = 0 ORDER BY sent_at DESC LIMIT ?"
    } else {
        "SELECT * FROM notifications WHERE user_id = ? ORDER BY sent_at DESC LIMIT ?"
    };
    let rows = sqlx::query(sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    let records = rows
        .iter()
        .filter_map(|row| {
            let id: String = row.get("id");
            let sent_raw: String = row.get("sent_at");
            let Some(sent_at) = parse_ts(&sent_raw) else {
                warn!(notification_id = %id, raw = %sent_raw, "skipping notification with malformed sent_at");
                return None;
            };
            let payload_raw: String = row.get("payload");
            let payload: NotificationPayload = match serde_json::from_str(&payload_raw) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(notification_id = %id, ?err, "skipping notification with malformed payload");
                    return None;
                }
            };
            Some(NotificationRecord {
                id,
                user_id: row.get("user_id"),
                kind: row.get("kind"),
                title: row.get("title"),
                body: row.get("body"),
                payload,
                read: row.get::<i64, _>("read") != 0,
                sent_at,
            })
        })
        .collect();
    Ok(records)
}
