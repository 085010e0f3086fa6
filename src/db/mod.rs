//! Document-store module: entity models and SQL repositories.
//!
//! This module is split into two submodules:
//! - `model`: typed rows and write payloads used by repositories.
//! - `repo`: SQL-only functions that map rows into domain entities.
//!
//! External modules should import from `shelfwatch::db` — we re-export the
//! repository API and commonly used models for convenience.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{NewInventoryItem, NewReceipt};
