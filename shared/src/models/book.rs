//! Book Model

use serde::{Deserialize, Serialize};

/// Book catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub isbn: Option<String>,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub description: Option<String>,
    pub publish_year: Option<i64>,
    pub page_count: Option<i64>,
    pub cover_type: Option<String>,
    pub stock_quantity: i64,
    pub sold_quantity: i64,
    pub publisher_id: Option<i64>,
    /// "Active" | "Hidden"
    pub status: String,
    pub created_at: i64,
}

impl Book {
    /// 有折扣价时以折扣价为准
    pub fn current_price(&self) -> f64 {
        self.discount_price.unwrap_or(self.price)
    }
}

/// Book list row joined with publisher name and main image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BookListItem {
    pub id: i64,
    pub title: String,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub stock_quantity: i64,
    pub sold_quantity: i64,
    pub status: String,
    pub publisher_name: Option<String>,
    pub main_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BookImage {
    pub id: i64,
    pub book_id: i64,
    pub image_url: String,
    pub is_main: bool,
}

/// Create payload. Image URLs: first entry becomes the main image unless
/// `main_image_index` says otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCreate {
    pub title: String,
    pub isbn: Option<String>,
    pub price: f64,
    pub discount_price: Option<f64>,
    pub description: Option<String>,
    pub publish_year: Option<i64>,
    pub page_count: Option<i64>,
    pub cover_type: Option<String>,
    #[serde(default)]
    pub stock_quantity: i64,
    pub publisher_id: Option<i64>,
    #[serde(default)]
    pub author_ids: Vec<i64>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub price: Option<f64>,
    pub discount_price: Option<f64>,
    pub description: Option<String>,
    pub publish_year: Option<i64>,
    pub page_count: Option<i64>,
    pub cover_type: Option<String>,
    pub publisher_id: Option<i64>,
    pub status: Option<String>,
    pub author_ids: Option<Vec<i64>>,
    pub category_ids: Option<Vec<i64>>,
    pub image_urls: Option<Vec<String>>,
}
