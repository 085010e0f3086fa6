//! Time-bucketed trend reports over receipts and consumed inventory.
//!
//! Reports are zero-filled: a window of `days` always yields exactly `days`
//! buckets in chronological order, ending on the current calendar day.
//! An event belongs to the window iff it happened before `now` and its
//! calendar day falls on one of the bucket days, so the bucket sum always
//! equals the in-window event sum.
//!
//! Days are calendar days in `now`'s timezone: callers reporting to a user
//! pass a `Local` (or user-specific) `now` so that an evening purchase
//! lands on the user's day, not the UTC one.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::model::{InventoryItem, Receipt};

/// Flat dollar estimate per wasted item.
const WASTE_VALUE_PER_ITEM: f64 = 5.0;

/// What a trend series measures; controls rounding of bucket values.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Spending,
    Calories,
}

impl MetricKind {
    fn round(&self, value: f64) -> f64 {
        match self {
            MetricKind::Spending => round_cents(value),
            MetricKind::Calories => value.round(),
        }
    }
}

/// A dated numeric event feeding a trend series.
#[derive(Debug, Clone, Copy)]
pub struct DatedValue {
    pub at: DateTime<Utc>,
    pub value: f64,
}

/// One calendar day's aggregated value.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub value: f64,
    /// Day-of-month display label, e.g. "07".
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub kind: MetricKind,
    pub days: u32,
    pub buckets: Vec<DailyBucket>,
    pub total: f64,
    pub average_per_day: f64,
}

/// Receipts as spending events.
pub fn spending_events(receipts: &[Receipt]) -> Vec<DatedValue> {
    receipts
        .iter()
        .map(|r| DatedValue {
            at: r.purchase_date,
            value: r.total_amount,
        })
        .collect()
}

/// Consumed inventory items as calorie events. Items without a consumed
/// date or calorie count contribute nothing.
pub fn calorie_events(consumed: &[InventoryItem]) -> Vec<DatedValue> {
    consumed
        .iter()
        .filter_map(|item| {
            let at = item.consumed_date?;
            Some(DatedValue {
                at,
                value: item.calories.unwrap_or(0.0),
            })
        })
        .collect()
}

/// Build a zero-filled daily series for the `days`-day window ending today.
///
/// "Today" and day membership are taken in `now`'s timezone; events
/// timestamped at or after `now` are out of window.
pub fn compute_trend<Tz: TimeZone>(
    events: &[DatedValue],
    days: u32,
    kind: MetricKind,
    now: DateTime<Tz>,
) -> TrendReport {
    let tz = now.timezone();
    let today = now.date_naive();
    let start = today - Duration::days(days.saturating_sub(1) as i64);

    let mut per_day: HashMap<NaiveDate, f64> = HashMap::new();
    let mut total = 0.0;
    for event in events {
        let day = event.at.with_timezone(&tz).date_naive();
        if days > 0 && event.at < now && day >= start && day <= today {
            *per_day.entry(day).or_insert(0.0) += event.value;
            total += event.value;
        }
    }

    let buckets = (0..days)
        .map(|offset| {
            let date = start + Duration::days(offset as i64);
            DailyBucket {
                date,
                value: kind.round(per_day.get(&date).copied().unwrap_or(0.0)),
                label: format!("{:02}", date.day()),
            }
        })
        .collect();

    let average_per_day = if days > 0 { total / days as f64 } else { 0.0 };
    TrendReport {
        kind,
        days,
        buckets,
        total: kind.round(total),
        average_per_day: kind.round(average_per_day),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WasteStats {
    pub total_items: usize,
    pub expired_items: usize,
    pub waste_percentage: f64,
    pub estimated_waste_value: f64,
    pub top_categories: Vec<CategoryCount>,
}

/// Waste report over a full inventory snapshot: items past expiration and
/// never consumed. Top categories are ordered by count descending, ties by
/// first-encountered order.
pub fn waste_stats(items: &[InventoryItem], now: DateTime<Utc>, top_n: usize) -> WasteStats {
    let total_items = items.len();
    let wasted: Vec<&InventoryItem> = items
        .iter()
        .filter(|item| !item.consumed && item.expiration_date < now)
        .collect();

    let mut counts: Vec<CategoryCount> = Vec::new();
    for item in &wasted {
        let name = item.category.as_str();
        match counts.iter_mut().find(|c| c.category == name) {
            Some(entry) => entry.count += 1,
            None => counts.push(CategoryCount {
                category: name.to_string(),
                count: 1,
            }),
        }
    }
    // Stable sort keeps first-encountered order among equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(top_n);

    let waste_percentage = if total_items > 0 {
        round_tenths(wasted.len() as f64 / total_items as f64 * 100.0)
    } else {
        0.0
    };

    WasteStats {
        total_items,
        expired_items: wasted.len(),
        waste_percentage,
        estimated_waste_value: round_cents(wasted.len() as f64 * WASTE_VALUE_PER_ITEM),
        top_categories: counts,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SavingsStats {
    pub total_savings: f64,
    pub average_savings_per_meal: f64,
    pub comparisons_made: usize,
    pub projected_yearly_savings: f64,
}

/// Aggregate home-cooking savings. The yearly projection is deliberately
/// naive (average per comparison scaled to a year) and zero when empty.
pub fn savings_stats(savings: &[f64]) -> SavingsStats {
    let total: f64 = savings.iter().sum();
    let count = savings.len();
    let average = if count > 0 { total / count as f64 } else { 0.0 };
    let projected = if count > 0 { average * 365.0 } else { 0.0 };
    SavingsStats {
        total_savings: round_cents(total),
        average_savings_per_meal: round_cents(average),
        comparisons_made: count,
        projected_yearly_savings: round_cents(projected),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TodaySummary {
    pub spent_today: f64,
    pub remaining_budget: f64,
    pub budget: f64,
    pub calories_today: f64,
    pub protein_today: f64,
}

/// Today's spending and nutrition, used by the daily summary notification.
/// "Today" is the calendar day of `now` in `now`'s timezone.
pub fn today_summary<Tz: TimeZone>(
    receipts: &[Receipt],
    consumed: &[InventoryItem],
    budget: f64,
    now: DateTime<Tz>,
) -> TodaySummary {
    let tz = now.timezone();
    let today = now.date_naive();

    let spent_today: f64 = receipts
        .iter()
        .filter(|r| r.purchase_date.with_timezone(&tz).date_naive() == today)
        .map(|r| r.total_amount)
        .sum();

    let mut calories_today = 0.0;
    let mut protein_today = 0.0;
    for item in consumed {
        if item.consumed_date.map(|d| d.with_timezone(&tz).date_naive()) == Some(today) {
            calories_today += item.calories.unwrap_or(0.0);
            protein_today += item.protein.unwrap_or(0.0);
        }
    }

    TodaySummary {
        spent_today: round_cents(spent_today),
        remaining_budget: round_cents(budget - spent_today),
        budget: round_cents(budget),
        calories_today: calories_today.round(),
        protein_today: round_tenths(protein_today),
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FoodCategory;
    use chrono::{FixedOffset, NaiveDateTime};

    fn at(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    fn item(category: FoodCategory, expiration: DateTime<Utc>, consumed: bool) -> InventoryItem {
        InventoryItem {
            id: "i".into(),
            user_id: "u".into(),
            name: "item".into(),
            category,
            quantity: 1.0,
            unit: "pc".into(),
            purchase_date: expiration - Duration::days(7),
            expiration_date: expiration,
            calories: None,
            protein: None,
            receipt_id: None,
            consumed,
            consumed_date: consumed.then(|| expiration),
            last_notified_at: None,
        }
    }

    #[test]
    fn empty_events_yield_zero_filled_window() {
        let now = at("2024-05-10 15:00:00");
        let report = compute_trend(&[], 7, MetricKind::Spending, now);
        assert_eq!(report.buckets.len(), 7);
        assert!(report.buckets.iter().all(|b| b.value == 0.0));
        assert_eq!(report.total, 0.0);
        assert_eq!(report.average_per_day, 0.0);
        // Chronological, ending today.
        let dates: Vec<NaiveDate> = report.buckets.iter().map(|b| b.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
        assert_eq!(dates.last().copied(), Some(now.date_naive()));
    }

    #[test]
    fn bucket_sum_equals_in_window_sum() {
        let now = at("2024-05-10 15:00:00");
        let events = vec![
            DatedValue { at: at("2024-05-10 09:00:00"), value: 12.5 },
            DatedValue { at: at("2024-05-08 20:00:00"), value: 4.0 },
            DatedValue { at: at("2024-05-08 07:00:00"), value: 1.5 },
            // Outside the 7-day window; must be discarded.
            DatedValue { at: at("2024-05-01 12:00:00"), value: 99.0 },
        ];
        let report = compute_trend(&events, 7, MetricKind::Spending, now);
        let bucket_sum: f64 = report.buckets.iter().map(|b| b.value).sum();
        assert_eq!(bucket_sum, 18.0);
        assert_eq!(report.total, 18.0);
        assert_eq!(report.average_per_day, round_cents(18.0 / 7.0));

        let today = report.buckets.last().unwrap();
        assert_eq!(today.value, 12.5);
        assert_eq!(today.label, "10");
        let may8 = report
            .buckets
            .iter()
            .find(|b| b.date == at("2024-05-08 00:00:00").date_naive())
            .unwrap();
        assert_eq!(may8.value, 5.5);
    }

    #[test]
    fn zero_day_window_is_empty_and_division_safe() {
        let now = at("2024-05-10 15:00:00");
        let events = vec![DatedValue { at: now, value: 10.0 }];
        let report = compute_trend(&events, 0, MetricKind::Calories, now);
        assert!(report.buckets.is_empty());
        assert_eq!(report.total, 0.0);
        assert_eq!(report.average_per_day, 0.0);
    }

    #[test]
    fn calorie_buckets_round_to_whole_units() {
        let now = at("2024-05-10 15:00:00");
        let earlier = now - Duration::hours(1);
        let events = vec![
            DatedValue { at: earlier, value: 120.4 },
            DatedValue { at: earlier, value: 80.3 },
        ];
        let report = compute_trend(&events, 1, MetricKind::Calories, now);
        assert_eq!(report.buckets[0].value, 201.0);
    }

    #[test]
    fn events_after_now_are_out_of_window() {
        let now = at("2024-05-10 15:00:00");
        let events = vec![
            DatedValue { at: now - Duration::hours(1), value: 10.0 },
            // Same calendar day, but not yet happened.
            DatedValue { at: now, value: 33.0 },
            DatedValue { at: now + Duration::hours(2), value: 99.0 },
        ];
        let report = compute_trend(&events, 7, MetricKind::Spending, now);
        assert_eq!(report.total, 10.0);
        assert_eq!(report.buckets.last().unwrap().value, 10.0);
    }

    #[test]
    fn buckets_follow_local_days_not_utc() {
        // 20:00 in UTC-7 is already 03:00 of the next day in UTC.
        let tz = FixedOffset::west_opt(7 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 5, 10, 20, 0, 0).unwrap();
        assert_eq!(now.with_timezone(&Utc), at("2024-05-11 03:00:00"));

        // 14:00 on the 10th for the user, 21:00 UTC.
        let events = vec![DatedValue { at: at("2024-05-10 21:00:00"), value: 42.0 }];
        let report = compute_trend(&events, 7, MetricKind::Spending, now);
        assert_eq!(report.total, 42.0);
        let today = report.buckets.last().unwrap();
        assert_eq!(today.date, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
        assert_eq!(today.value, 42.0);
    }

    #[test]
    fn waste_stats_reports_percentage_and_top_categories() {
        let now = at("2024-05-10 15:00:00");
        let past = now - Duration::days(2);
        let future = now + Duration::days(5);
        let mut items = vec![
            item(FoodCategory::Produce, past, false),
            item(FoodCategory::Produce, past, false),
            item(FoodCategory::Produce, past, false),
            item(FoodCategory::Dairy, past, false),
        ];
        // Fresh or consumed items don't count as waste.
        items.extend((0..5).map(|_| item(FoodCategory::Pantry, future, false)));
        items.push(item(FoodCategory::Meat, past, true));

        let stats = waste_stats(&items, now, 5);
        assert_eq!(stats.total_items, 10);
        assert_eq!(stats.expired_items, 4);
        assert_eq!(stats.waste_percentage, 40.0);
        assert_eq!(stats.estimated_waste_value, 20.0);
        assert_eq!(stats.top_categories.len(), 2);
        assert_eq!(stats.top_categories[0].category, "produce");
        assert_eq!(stats.top_categories[0].count, 3);
        assert_eq!(stats.top_categories[1].category, "dairy");
    }

    #[test]
    fn waste_ties_keep_first_encountered_order() {
        let now = at("2024-05-10 15:00:00");
        let past = now - Duration::days(1) - Duration::hours(1);
        let items = vec![
            item(FoodCategory::Dairy, past, false),
            item(FoodCategory::Produce, past, false),
        ];
        let stats = waste_stats(&items, now, 5);
        assert_eq!(stats.top_categories[0].category, "dairy");
        assert_eq!(stats.top_categories[1].category, "produce");
    }

    #[test]
    fn waste_top_n_truncates() {
        let now = at("2024-05-10 15:00:00");
        let past = now - Duration::days(2);
        let items = vec![
            item(FoodCategory::Produce, past, false),
            item(FoodCategory::Dairy, past, false),
            item(FoodCategory::Meat, past, false),
        ];
        let stats = waste_stats(&items, now, 2);
        assert_eq!(stats.top_categories.len(), 2);
    }

    #[test]
    fn savings_projection_requires_at_least_one_comparison() {
        let empty = savings_stats(&[]);
        assert_eq!(empty.projected_yearly_savings, 0.0);
        assert_eq!(empty.average_savings_per_meal, 0.0);

        let stats = savings_stats(&[10.0, 6.0]);
        assert_eq!(stats.total_savings, 16.0);
        assert_eq!(stats.average_savings_per_meal, 8.0);
        assert_eq!(stats.projected_yearly_savings, 2920.0);
    }

    #[test]
    fn today_summary_only_counts_today() {
        let now = at("2024-05-10 21:00:00");
        let receipts = vec![
            Receipt {
                id: "r1".into(),
                user_id: "u".into(),
                store_name: None,
                purchase_date: at("2024-05-10 08:00:00"),
                total_amount: 24.5,
            },
            Receipt {
                id: "r2".into(),
                user_id: "u".into(),
                store_name: None,
                purchase_date: at("2024-05-09 08:00:00"),
                total_amount: 99.0,
            },
        ];
        let mut eaten = item(FoodCategory::Dairy, now + Duration::days(3), true);
        eaten.consumed_date = Some(at("2024-05-10 12:00:00"));
        eaten.calories = Some(150.0);
        eaten.protein = Some(8.2);
        let mut old = eaten.clone();
        old.consumed_date = Some(at("2024-05-09 12:00:00"));

        let summary = today_summary(&receipts, &[eaten, old], 50.0, now);
        assert_eq!(summary.spent_today, 24.5);
        assert_eq!(summary.remaining_budget, 25.5);
        assert_eq!(summary.calories_today, 150.0);
        assert_eq!(summary.protein_today, 8.2);
    }

    #[test]
    fn today_summary_uses_local_calendar_day() {
        let tz = FixedOffset::west_opt(7 * 3600).unwrap();
        // Summary runs at 20:00 for the user; UTC has moved on to the 11th.
        let now = tz.with_ymd_and_hms(2024, 5, 10, 20, 0, 0).unwrap();
        let receipts = vec![Receipt {
            id: "r1".into(),
            user_id: "u".into(),
            store_name: None,
            // 14:00 on the 10th for the user.
            purchase_date: at("2024-05-10 21:00:00"),
            total_amount: 42.0,
        }];
        let mut eaten = item(FoodCategory::Dairy, at("2024-05-14 00:00:00"), true);
        eaten.consumed_date = Some(at("2024-05-10 19:30:00"));
        eaten.calories = Some(300.0);

        let summary = today_summary(&receipts, &[eaten], 60.0, now);
        assert_eq!(summary.spent_today, 42.0);
        assert_eq!(summary.calories_today, 300.0);
    }
}
