//! Perishable-inventory expiration tracking, alerting and trend summaries.
//!
//! The crate owns the decision logic: shelf-life estimation, urgency
//! classification, notification dedup, trend aggregation and the periodic
//! scan/summary jobs. HTTP routing, auth and receipt OCR live elsewhere and
//! talk to this core through the `db` and `push` contracts.

pub mod config;
pub mod db;
pub mod dispatch;
pub mod expiration;
pub mod model;
pub mod push;
pub mod scheduler;
pub mod trends;

use chrono::{DateTime, Utc};

use config::Config;
use model::{FoodCategory, InventoryItem};
use trends::WasteStats;

/// Shelf-life estimation for item intake, with the configured fallback for
/// names and categories the tables don't cover.
pub fn estimate_expiration(
    cfg: &Config,
    name: &str,
    category: Option<FoodCategory>,
    purchase_date: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    expiration::estimate_expiration(name, category, purchase_date, cfg.app.default_shelf_life_days)
}

/// Waste report over an inventory snapshot, keeping the configured number
/// of top wasted categories.
pub fn waste_report(cfg: &Config, items: &[InventoryItem], now: DateTime<Utc>) -> WasteStats {
    trends::waste_stats(items, now, cfg.app.waste_top_n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDateTime};

    fn test_config() -> Config {
        serde_yaml::from_str(config::example()).unwrap()
    }

    fn at(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    fn expired_item(category: FoodCategory, now: DateTime<Utc>) -> InventoryItem {
        InventoryItem {
            id: "i".into(),
            user_id: "u".into(),
            name: "item".into(),
            category,
            quantity: 1.0,
            unit: "pc".into(),
            purchase_date: now - Duration::days(10),
            expiration_date: now - Duration::days(2),
            calories: None,
            protein: None,
            receipt_id: None,
            consumed: false,
            consumed_date: None,
            last_notified_at: None,
        }
    }

    #[test]
    fn configured_fallback_shelf_life_is_honored() {
        let mut cfg = test_config();
        cfg.app.default_shelf_life_days = 45;
        let purchase = at("2024-05-10 09:00:00");
        // No keyword match and no category means the configured fallback.
        let expiration = estimate_expiration(&cfg, "mystery box", None, Some(purchase));
        assert_eq!(expiration - purchase, Duration::days(45));
    }

    #[test]
    fn configured_top_n_limits_waste_categories() {
        let mut cfg = test_config();
        cfg.app.waste_top_n = 1;
        let now = at("2024-05-10 09:00:00");
        let items = vec![
            expired_item(FoodCategory::Produce, now),
            expired_item(FoodCategory::Produce, now),
            expired_item(FoodCategory::Dairy, now),
        ];
        let stats = waste_report(&cfg, &items, now);
        assert_eq!(stats.expired_items, 3);
        assert_eq!(stats.top_categories.len(), 1);
        assert_eq!(stats.top_categories[0].category, "produce");
    }
}
