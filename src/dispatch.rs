//! Notification dispatcher: one push call, then persist the outcome.
//!
//! A dispatch only counts once the endpoint acknowledges it. On any
//! failure nothing is written, so the item stays eligible and the next
//! scan cycle retries under the normal threshold/dedup rules.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::{self, Pool};
use crate::model::{InventoryItem, NotificationPayload, NotificationRecord};
use crate::push::{self, PushMessage, PushService};

/// Send one notification and append its record on success. Returns whether
/// the push was acknowledged.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all)]
pub async fn dispatch(
    pool: &Pool,
    push: &dyn PushService,
    user_id: &str,
    token: &str,
    title: String,
    body: String,
    payload: NotificationPayload,
    now: DateTime<Utc>,
) -> Result<bool> {
    let message = PushMessage {
        to: token.to_string(),
        title,
        body,
        payload,
    };
    let outcome = match push.send(&message).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(?err, user_id, "push send failed");
            return Ok(false);
        }
    };
    if !outcome.is_delivered() {
        warn!(user_id, ?outcome, "push not acknowledged");
        return Ok(false);
    }

    let record = NotificationRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind: message.payload.kind().to_string(),
        title: message.title,
        body: message.body,
        payload: message.payload,
        read: false,
        sent_at: now,
    };
    db::append_notification_record(pool, &record).await?;
    info!(user_id, kind = record.kind, "notification dispatched");
    Ok(true)
}

/// Dispatch an expiration alert for one item and, if acknowledged, advance
/// the item's `last_notified_at` to the dispatch time. This is the
/// read-decide-write critical section for that field; callers must not run
/// it concurrently for the same item.
#[instrument(skip_all, fields(item_id = %item.id))]
pub async fn dispatch_expiration(
    pool: &Pool,
    push: &dyn PushService,
    token: &str,
    item: &InventoryItem,
    days_remaining: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    let (title, body) = push::expiration_message(&item.name, days_remaining);
    let payload = NotificationPayload::Expiration {
        item_id: item.id.clone(),
        item_name: item.name.clone(),
        days_until: days_remaining,
    };
    let sent = dispatch(pool, push, &item.user_id, token, title, body, payload, now).await?;
    if sent {
        db::update_last_notified(pool, &item.id, now).await?;
    }
    Ok(sent)
}
