//! Promotion Model

use serde::{Deserialize, Serialize};

/// Store-wide promotion; `name` doubles as the coupon code at checkout.
/// `discount_type` is "Percent" or "Amount".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Promotion {
    pub id: i64,
    pub name: String,
    pub discount_type: String,
    pub discount_value: f64,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

impl Promotion {
    /// 活动在 `now` 时刻是否生效（无日期 = 不限）
    pub fn is_active_at(&self, now: i64) -> bool {
        self.start_date.map_or(true, |s| s <= now) && self.end_date.map_or(true, |e| e >= now)
    }

    /// 对小计金额计算折扣额
    pub fn discount_for(&self, subtotal: f64) -> f64 {
        if self.discount_type == "Percent" {
            subtotal * (self.discount_value / 100.0)
        } else {
            self.discount_value
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionCreate {
    pub name: String,
    pub discount_type: String,
    pub discount_value: f64,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionUpdate {
    pub name: Option<String>,
    pub discount_type: Option<String>,
    pub discount_value: Option<f64>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
}
