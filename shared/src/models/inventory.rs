//! Inventory Log Model

use serde::{Deserialize, Serialize};

/// One stock movement. Negative `change_quantity` = stock out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryLog {
    pub id: i64,
    pub book_id: i64,
    pub change_quantity: i64,
    pub reason: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryLogRow {
    pub id: i64,
    pub book_id: i64,
    pub change_quantity: i64,
    pub reason: Option<String>,
    pub created_at: i64,
    pub book_title: String,
}
