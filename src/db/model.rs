//! Write payloads accepted by the repositories.
//!
//! Keep these structs focused on what a caller supplies when creating a
//! record; ids and bookkeeping fields are assigned by the repository.

use chrono::{DateTime, Utc};

use crate::model::FoodCategory;

/// Fields supplied when a new inventory item is created (manual entry or
/// receipt ingestion). `expiration_date` is typically produced by the
/// expiration estimator.
#[derive(Debug, Clone)]
pub struct NewInventoryItem {
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
}

/// Fields supplied when a processed receipt is stored.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub user_id: String,
    pub store_name: Option<String>,
    pub purchase_date: DateTime<Utc>,
    pub total_amount: f64,
}
