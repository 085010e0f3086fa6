use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Food categories recognized by the expiration tables. Anything the store
/// hands us that doesn't parse falls back to `Other`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    Produce,
    Dairy,
    Meat,
    Pantry,
    Frozen,
    Beverages,
    Snacks,
    Other,
}

impl FoodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodCategory::Produce => "produce",
            FoodCategory::Dairy => "dairy",
            FoodCategory::Meat => "meat",
            FoodCategory::Pantry => "pantry",
            FoodCategory::Frozen => "frozen",
            FoodCategory::Beverages => "beverages",
            FoodCategory::Snacks => "snacks",
            FoodCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<FoodCategory> {
        match s.to_ascii_lowercase().as_str() {
            "produce" => Some(FoodCategory::Produce),
            "dairy" => Some(FoodCategory::Dairy),
            "meat" => Some(FoodCategory::Meat),
            "pantry" => Some(FoodCategory::Pantry),
            "frozen" => Some(FoodCategory::Frozen),
            "beverages" => Some(FoodCategory::Beverages),
            "snacks" => Some(FoodCategory::Snacks),
            "other" => Some(FoodCategory::Other),
            _ => None,
        }
    }
}

/// How soon an item expires, ordered from worst to best. Derived from the
/// expiration date at evaluation time, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Expired,
    ExpiresToday,
    Urgent,
    Warning,
    Good,
}

impl UrgencyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyTier::Expired => "expired",
            UrgencyTier::ExpiresToday => "expires_today",
            UrgencyTier::Urgent => "urgent",
            UrgencyTier::Warning => "warning",
            UrgencyTier::Good => "good",
        }
    }

    pub fn parse(s: &str) -> Option<UrgencyTier> {
        match s {
            "expired" => Some(UrgencyTier::Expired),
            "expires_today" => Some(UrgencyTier::ExpiresToday),
            "urgent" => Some(UrgencyTier::Urgent),
            "warning" => Some(UrgencyTier::Warning),
            "good" => Some(UrgencyTier::Good),
            _ => None,
        }
    }

    /// Display color for the tier.
    pub fn color(&self) -> &'static str {
        match self {
            UrgencyTier::Expired => "#EF4444",
            UrgencyTier::ExpiresToday => "#F97316",
            UrgencyTier::Urgent => "#F59E0B",
            UrgencyTier::Warning => "#EAB308",
            UrgencyTier::Good => "#22C55E",
        }
    }
}

/// Color for a raw tier tag; unknown tags map to gray.
pub fn urgency_color(tag: &str) -> &'static str {
    UrgencyTier::parse(tag).map(|t| t.color()).unwrap_or("#6B7280")
}

/// A perishable item in a user's inventory. The scheduler only ever writes
/// `last_notified_at`; everything else belongs to the owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub category: FoodCategory,
    pub quantity: f64,
    pub unit: String,
    pub purchase_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub receipt_id: Option<String>,
    pub consumed: bool,
    pub consumed_date: Option<DateTime<Utc>>,
    pub last_notified_at: Option<DateTime<Utc>>,
}

/// A processed receipt; only the fields the trend aggregator needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub user_id: String,
    pub store_name: Option<String>,
    pub purchase_date: DateTime<Utc>,
    pub total_amount: f64,
}

/// Typed notification payload, tagged by `type` on the wire and in storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    Expiration {
        item_id: String,
        item_name: String,
        days_until: i64,
    },
    Budget {
        spent: f64,
        budget: f64,
    },
    Achievement {
        name: String,
        description: String,
    },
    MealSuggestion {
        ingredients: Vec<String>,
    },
    DailySummary {
        spent_today: f64,
        calories_today: f64,
        expiring_soon: i64,
    },
}

impl NotificationPayload {
    /// The `type` tag, also used as the stored record kind.
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationPayload::Expiration { .. } => "expiration",
            NotificationPayload::Budget { .. } => "budget",
            NotificationPayload::Achievement { .. } => "achievement",
            NotificationPayload::MealSuggestion { .. } => "meal_suggestion",
            NotificationPayload::DailySummary { .. } => "daily_summary",
        }
    }
}

/// A persisted notification. Append-only except for the `read` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub payload: NotificationPayload,
    pub read: bool,
    pub sent_at: DateTime<Utc>,
}
