//! Order Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order lifecycle. Stock is deducted exactly once, on the transition
/// into `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipping,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipping => "Shipping",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Confirmed" => Ok(OrderStatus::Confirmed),
            "Shipping" => Ok(OrderStatus::Shipping),
            "Completed" => Ok(OrderStatus::Completed),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub order_date: i64,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub shipping_address: String,
    pub shipping_method_name: String,
    pub shipping_fee: f64,
}

/// Order line item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderDetail {
    pub id: i64,
    pub order_id: i64,
    pub book_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
}

/// Line item joined with book info for display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderDetailRow {
    pub id: i64,
    pub order_id: i64,
    pub book_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
    pub book_title: String,
    pub image_url: Option<String>,
}

/// Order list row joined with customer info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderWithUser {
    pub id: i64,
    pub user_id: i64,
    pub order_date: i64,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub shipping_address: String,
    pub shipping_method_name: String,
    pub shipping_fee: f64,
    pub user_name: String,
    pub user_email: String,
}

/// Checkout payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Free-form address, used when no saved address is selected
    pub shipping_address: Option<String>,
    pub payment_method: String,
    pub shipping_method_id: i64,
    /// Saved address id takes precedence over the free-form string
    pub address_id: Option<i64>,
}
