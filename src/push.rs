//! Push-delivery endpoint client and notification message builders.
//!
//! The wire contract follows Expo's push API: a single message or an array
//! of messages is POSTed, and the response carries a per-message `status`.
//! Anything other than an acknowledged `"ok"` is a failure; the caller
//! decides whether and when to retry.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::model::NotificationPayload;
use crate::trends::TodaySummary;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One outbound push message.
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub payload: NotificationPayload,
}

/// Per-message delivery outcome, positionally correlated for batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    Failed(String),
}

impl PushOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, PushOutcome::Delivered)
    }
}

/// Seam for the push endpoint so tests can substitute a recording mock.
#[async_trait]
pub trait PushService: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<PushOutcome>;

    /// Outcomes are positionally correlated with `messages`; the returned
    /// vector always has the same length as the input.
    async fn send_batch(&self, messages: &[PushMessage]) -> Result<Vec<PushOutcome>>;
}

#[derive(Clone)]
pub struct ExpoPushClient {
    http: Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl fmt::Debug for ExpoPushClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpoPushClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ExpoPushClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let endpoint = Url::parse(&cfg.push.endpoint).context("invalid push.endpoint URL")?;
        Ok(Self::new(
            endpoint,
            cfg.push
                .access_token
                .clone()
                .filter(|t| !t.trim().is_empty()),
        ))
    }

    pub fn new(endpoint: Url, access_token: Option<String>) -> Self {
        let http = Client::builder()
            .user_agent("shelfwatch/0.1")
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint,
            access_token,
        }
    }

    pub fn build_request(&self, body: &Value) -> Result<reqwest::Request> {
        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(token) = &self.access_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.build().context("failed to build push request")
    }

    async fn execute(&self, body: Value) -> Result<Value> {
        let request = self.build_request(&body)?;
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach push endpoint")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "push endpoint error: {}", body);
            return Err(anyhow!("push endpoint error {}: {}", status, body));
        }
        res.json::<Value>()
            .await
            .context("invalid push response JSON")
    }
}

#[async_trait]
impl PushService for ExpoPushClient {
    async fn send(&self, message: &PushMessage) -> Result<PushOutcome> {
        let response = self.execute(build_push_body(message)).await?;
        Ok(single_outcome(&response))
    }

    async fn send_batch(&self, messages: &[PushMessage]) -> Result<Vec<PushOutcome>> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }
        let body = Value::Array(messages.iter().map(build_push_body).collect());
        let response = self.execute(body).await?;
        Ok(batch_outcomes(&response, messages.len()))
    }
}

/// Wire shape of one push message.
pub fn build_push_body(message: &PushMessage) -> Value {
    json!({
        "to": message.to,
        "sound": "default",
        "title": message.title,
        "body": message.body,
        "data": message.payload,
    })
}

/// Interpret a single-send acknowledgment: `data.status == "ok"` means
/// delivered, anything else is a failure with whatever detail was given.
pub fn single_outcome(response: &Value) -> PushOutcome {
    match response["data"]["status"].as_str() {
        Some("ok") => PushOutcome::Delivered,
        Some(other) => PushOutcome::Failed(format!("push status {other}")),
        None => PushOutcome::Failed("malformed push acknowledgment".into()),
    }
}

/// Correlate batch acknowledgments to input positions. A missing or
/// malformed entry at position `i` is a failure for that message, never
/// silently dropped.
pub fn batch_outcomes(response: &Value, expected: usize) -> Vec<PushOutcome> {
    let entries = response["data"].as_array();
    (0..expected)
        .map(|i| match entries.and_then(|e| e.get(i)) {
            Some(entry) => match entry["status"].as_str() {
                Some("ok") => PushOutcome::Delivered,
                Some(other) => PushOutcome::Failed(format!("push status {other}")),
                None => PushOutcome::Failed("malformed batch entry".into()),
            },
            None => PushOutcome::Failed("missing batch result".into()),
        })
        .collect()
}

/// Title and body for an expiration alert; wording depends on how close the
/// item is.
pub fn expiration_message(item_name: &str, days_until: i64) -> (String, String) {
    match days_until {
        0 => (
            "⏰ Item Expiring Today!".to_string(),
            format!("{item_name} expires today. Use it or lose it!"),
        ),
        1 => (
            "⚠️ Item Expiring Tomorrow".to_string(),
            format!("{item_name} expires tomorrow. Plan to use it soon!"),
        ),
        n => (
            format!("📅 Item Expiring in {n} Days"),
            format!("{item_name} will expire soon. Consider using it!"),
        ),
    }
}

/// Budget status message; escalates at 90% and 100% of budget.
pub fn budget_message(spent: f64, budget: f64) -> (String, String) {
    let percentage = if budget > 0.0 { spent / budget * 100.0 } else { 100.0 };
    if percentage >= 100.0 {
        (
            "💰 Budget Exceeded!".to_string(),
            format!("You've spent ${spent:.2} of your ${budget:.2} budget."),
        )
    } else if percentage >= 90.0 {
        (
            "💸 Approaching Budget Limit".to_string(),
            format!("You've spent ${spent:.2} (90%) of your ${budget:.2} budget."),
        )
    } else {
        (
            "💵 Budget Update".to_string(),
            format!("You've spent ${spent:.2} of your ${budget:.2} budget."),
        )
    }
}

pub fn achievement_message(name: &str, description: &str) -> (String, String) {
    (
        format!("🏆 Achievement Unlocked: {name}"),
        description.to_string(),
    )
}

/// Suggest cooking with soon-to-expire ingredients; an empty list becomes a
/// restock nudge.
pub fn meal_suggestion_message(ingredients: &[String]) -> (String, String) {
    if ingredients.is_empty() {
        return (
            "🍳 Time to Shop!".to_string(),
            "Your pantry is running low. Time to restock!".to_string(),
        );
    }
    let mut items_text = ingredients[..ingredients.len().min(3)].join(", ");
    if ingredients.len() > 3 {
        items_text.push_str(&format!(" and {} more", ingredients.len() - 3));
    }
    (
        "🍳 Cook Before They Expire!".to_string(),
        format!("You have {items_text}. Check out recipe suggestions!"),
    )
}

pub fn daily_summary_message(summary: &TodaySummary, expiring_soon: i64) -> (String, String) {
    let mut body = format!(
        "Today: ${:.2} spent, {:.0} kcal eaten.",
        summary.spent_today, summary.calories_today
    );
    if expiring_soon > 0 {
        body.push_str(&format!(" {expiring_soon} items expire within 3 days."));
    }
    ("📊 Your Daily Summary".to_string(), body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> PushMessage {
        PushMessage {
            to: "ExponentPushToken[abc]".into(),
            title: "t".into(),
            body: "b".into(),
            payload: NotificationPayload::Expiration {
                item_id: "i1".into(),
                item_name: "milk".into(),
                days_until: 1,
            },
        }
    }

    #[test]
    fn build_push_body_shape() {
        let body = build_push_body(&sample_message());
        assert_eq!(body["to"], "ExponentPushToken[abc]");
        assert_eq!(body["sound"], "default");
        assert_eq!(body["title"], "t");
        assert_eq!(body["data"]["type"], "expiration");
        assert_eq!(body["data"]["item_name"], "milk");
    }

    #[test]
    fn build_request_sets_headers() {
        let client = ExpoPushClient::new(
            Url::parse("https://exp.host/--/api/v2/push/send").unwrap(),
            Some("secret".into()),
        );
        let request = client.build_request(&json!({"sample": true})).unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        let headers = request.headers();
        assert_eq!(
            headers.get("Authorization").and_then(|h| h.to_str().ok()),
            Some("Bearer secret")
        );
        assert_eq!(
            headers.get("Accept").and_then(|h| h.to_str().ok()),
            Some("application/json")
        );
    }

    #[test]
    fn single_outcome_requires_ok_status() {
        assert!(single_outcome(&json!({"data": {"status": "ok"}})).is_delivered());
        assert!(!single_outcome(&json!({"data": {"status": "error"}})).is_delivered());
        assert!(!single_outcome(&json!({"errors": []})).is_delivered());
    }

    #[test]
    fn batch_outcomes_are_positional() {
        let response = json!({"data": [
            {"status": "ok"},
            {"status": "error", "message": "DeviceNotRegistered"},
            {"unexpected": true},
        ]});
        let outcomes = batch_outcomes(&response, 3);
        assert_eq!(outcomes[0], PushOutcome::Delivered);
        assert!(!outcomes[1].is_delivered());
        assert!(!outcomes[2].is_delivered());
    }

    #[test]
    fn short_batch_response_fails_missing_positions() {
        let response = json!({"data": [{"status": "ok"}]});
        let outcomes = batch_outcomes(&response, 3);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_delivered());
        assert!(!outcomes[1].is_delivered());
        assert!(!outcomes[2].is_delivered());
    }

    #[test]
    fn expiration_wording_varies_by_days() {
        let (title, body) = expiration_message("Milk", 0);
        assert!(title.contains("Today"));
        assert!(body.contains("Milk"));
        let (title, _) = expiration_message("Milk", 1);
        assert!(title.contains("Tomorrow"));
        let (title, _) = expiration_message("Milk", 3);
        assert!(title.contains("3 Days"));
    }

    #[test]
    fn budget_message_escalates() {
        let (title, _) = budget_message(101.0, 100.0);
        assert!(title.contains("Exceeded"));
        let (title, _) = budget_message(92.0, 100.0);
        assert!(title.contains("Approaching"));
        let (title, _) = budget_message(10.0, 100.0);
        assert!(title.contains("Update"));
    }

    #[test]
    fn meal_suggestion_truncates_ingredient_list() {
        let (_, body) = meal_suggestion_message(&[]);
        assert!(body.contains("restock"));

        let names: Vec<String> = ["eggs", "milk", "spinach", "bread", "cheese"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (_, body) = meal_suggestion_message(&names);
        assert!(body.contains("eggs, milk, spinach and 2 more"));
    }
}
