//! Shipping Model

use serde::{Deserialize, Serialize};

/// Per-order shipping record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Shipping {
    pub id: i64,
    pub order_id: i64,
    pub shipping_company: String,
    pub tracking_number: Option<String>,
    pub status: String,
}

/// Selectable shipping method (fee snapshot is copied onto the order)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShippingMethod {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub estimated_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingMethodCreate {
    pub name: String,
    pub price: f64,
    pub estimated_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingMethodUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub estimated_days: Option<i64>,
}
