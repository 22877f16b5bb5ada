//! Notification Model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    /// "Order" | "Success" | "System"
    pub kind: Option<String>,
    pub redirect_url: Option<String>,
    pub is_read: bool,
    pub created_at: i64,
}
