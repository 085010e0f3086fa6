//! Shelf-life estimation, urgency classification and notification dedup.
//!
//! These are the pure decision functions the scan scheduler is built on.
//! Everything takes an explicit `now` so behavior is reproducible in tests.

use chrono::{DateTime, Duration, Utc};

use crate::model::{FoodCategory, UrgencyTier};

/// Global fallback when neither a keyword nor a category matches.
pub const DEFAULT_SHELF_LIFE_DAYS: i64 = 30;

/// Exact remaining-day values that make an item a notification candidate.
pub const DEFAULT_NOTIFY_THRESHOLDS: &[i64] = &[3, 1, 0];

/// Minimum gap between two notifications for the same item.
pub const DEFAULT_DEDUP_WINDOW_HOURS: i64 = 12;

/// Specific-item shelf lives in days. Order matters: the first keyword that
/// is a substring of the item name wins, regardless of specificity.
const SPECIFIC_SHELF_LIVES: &[(&str, i64)] = &[
    ("milk", 7),
    ("eggs", 21),
    ("chicken", 2),
    ("beef", 3),
    ("pork", 3),
    ("fish", 1),
    ("lettuce", 5),
    ("tomatoes", 7),
    ("bananas", 5),
    ("apples", 14),
    ("bread", 5),
    ("yogurt", 14),
    ("cheese", 30),
    ("butter", 60),
    ("spinach", 5),
    ("berries", 5),
    ("carrots", 21),
    ("potatoes", 60),
    ("onions", 30),
    ("garlic", 60),
];

fn category_shelf_life_days(category: FoodCategory) -> i64 {
    match category {
        FoodCategory::Produce => 7,
        FoodCategory::Dairy => 14,
        FoodCategory::Meat => 3,
        FoodCategory::Pantry => 365,
        FoodCategory::Frozen => 180,
        FoodCategory::Beverages => 30,
        FoodCategory::Snacks => 90,
        FoodCategory::Other => 30,
    }
}

/// Resolve the shelf life for an item. A `None` category (unrecognized raw
/// input) uses `fallback_days`.
pub fn shelf_life_days(name: &str, category: Option<FoodCategory>, fallback_days: i64) -> i64 {
    let lowered = name.to_lowercase();
    for (keyword, days) in SPECIFIC_SHELF_LIVES {
        if lowered.contains(keyword) {
            return *days;
        }
    }
    category.map(category_shelf_life_days).unwrap_or(fallback_days)
}

/// Estimate when an item expires. Never fails; unknown names and categories
/// fall back to defaults. `purchase_date` defaults to the current time.
pub fn estimate_expiration(
    name: &str,
    category: Option<FoodCategory>,
    purchase_date: Option<DateTime<Utc>>,
    fallback_days: i64,
) -> DateTime<Utc> {
    let purchase = purchase_date.unwrap_or_else(Utc::now);
    purchase + Duration::days(shelf_life_days(name, category, fallback_days))
}

/// Urgency of a single item at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Urgency {
    pub tier: UrgencyTier,
    pub days_remaining: i64,
}

impl Urgency {
    pub fn color(&self) -> &'static str {
        self.tier.color()
    }
}

/// Whole days until expiration, truncated toward zero: 23 hours out is 0
/// days, and an item is not `Expired` until a full day past its date.
pub fn days_remaining(expiration: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiration - now).num_days()
}

/// Classify how urgent an item is. Tier boundaries are evaluated in order
/// and are mutually exclusive over the integer day count.
pub fn classify_urgency(expiration: DateTime<Utc>, now: DateTime<Utc>) -> Urgency {
    let days = days_remaining(expiration, now);
    let tier = if days < 0 {
        UrgencyTier::Expired
    } else if days == 0 {
        UrgencyTier::ExpiresToday
    } else if days <= 1 {
        UrgencyTier::Urgent
    } else if days <= 3 {
        UrgencyTier::Warning
    } else {
        UrgencyTier::Good
    };
    Urgency {
        tier,
        days_remaining: days,
    }
}

/// Decide whether to notify for an item right now.
///
/// Only exact threshold days are candidates; an item observed at 2 days
/// never fires, no matter how long ago the last notification was. Within a
/// candidate day, a prior notification suppresses resends until the dedup
/// window has fully elapsed (boundary inclusive).
pub fn should_notify(
    days_remaining: i64,
    last_notified_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    thresholds: &[i64],
    dedup_window: Duration,
) -> bool {
    if !thresholds.contains(&days_remaining) {
        return false;
    }
    match last_notified_at {
        Some(last) => now - last >= dedup_window,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    #[test]
    fn keyword_beats_category() {
        // "chicken" is in the meat category (3 days) but the keyword says 2.
        assert_eq!(
            shelf_life_days("Chicken Breast", Some(FoodCategory::Meat), 30),
            2
        );
        assert_eq!(shelf_life_days("2% MILK", Some(FoodCategory::Dairy), 30), 7);
    }

    #[test]
    fn first_keyword_in_table_order_wins() {
        // Contains both "milk" (7) and "chicken" (2); "milk" is declared first.
        assert_eq!(
            shelf_life_days("chicken milkshake", Some(FoodCategory::Other), 30),
            7
        );
    }

    #[test]
    fn category_fallback_and_global_default() {
        assert_eq!(shelf_life_days("mystery box", Some(FoodCategory::Dairy), 30), 14);
        assert_eq!(shelf_life_days("mystery box", Some(FoodCategory::Pantry), 30), 365);
        assert_eq!(shelf_life_days("mystery box", None, 30), 30);
        assert_eq!(shelf_life_days("mystery box", None, 45), 45);
    }

    #[test]
    fn estimate_adds_exact_shelf_life() {
        let purchase = at("2024-05-01 09:30:00");
        let expiration =
            estimate_expiration("greek yogurt", Some(FoodCategory::Dairy), Some(purchase), 30);
        assert_eq!(expiration - purchase, Duration::days(14));
    }

    #[test]
    fn urgency_tier_boundaries() {
        let now = at("2024-05-10 12:00:00");
        let cases = [
            (now - Duration::days(2), UrgencyTier::Expired, -2),
            (now - Duration::hours(25), UrgencyTier::Expired, -1),
            // Two hours past still truncates to 0 remaining days.
            (now - Duration::hours(2), UrgencyTier::ExpiresToday, 0),
            (now + Duration::hours(23), UrgencyTier::ExpiresToday, 0),
            (now + Duration::days(1), UrgencyTier::Urgent, 1),
            (now + Duration::days(2), UrgencyTier::Warning, 2),
            (now + Duration::days(3), UrgencyTier::Warning, 3),
            (now + Duration::days(4), UrgencyTier::Good, 4),
            (now + Duration::days(30), UrgencyTier::Good, 30),
        ];
        for (expiration, tier, days) in cases {
            let urgency = classify_urgency(expiration, now);
            assert_eq!(urgency.tier, tier, "expiration {expiration}");
            assert_eq!(urgency.days_remaining, days, "expiration {expiration}");
        }
    }

    #[test]
    fn non_threshold_days_never_fire() {
        let now = at("2024-05-10 12:00:00");
        for days in [-1, 2, 4, 10] {
            assert!(!should_notify(
                days,
                None,
                now,
                DEFAULT_NOTIFY_THRESHOLDS,
                Duration::hours(DEFAULT_DEDUP_WINDOW_HOURS)
            ));
        }
    }

    #[test]
    fn threshold_day_without_prior_notification_fires() {
        let now = at("2024-05-10 12:00:00");
        for days in [3, 1, 0] {
            assert!(should_notify(
                days,
                None,
                now,
                DEFAULT_NOTIFY_THRESHOLDS,
                Duration::hours(DEFAULT_DEDUP_WINDOW_HOURS)
            ));
        }
    }

    #[test]
    fn dedup_window_boundary_is_inclusive() {
        let last = at("2024-05-10 00:00:00");
        let window = Duration::hours(12);
        let check = |now| should_notify(1, Some(last), now, DEFAULT_NOTIFY_THRESHOLDS, window);
        assert!(!check(last + Duration::hours(11)));
        assert!(!check(last + Duration::hours(12) - Duration::seconds(1)));
        assert!(check(last + Duration::hours(12)));
        assert!(check(last + Duration::hours(13)));
    }
}
