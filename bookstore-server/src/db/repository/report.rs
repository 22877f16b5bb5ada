//! Report Repository
//!
//! Aggregate queries for the admin dashboard and sales reports.
//! Revenue counts completed orders only.

use super::RepoResult;
use serde::Serialize;
use shared::models::BookListItem;
use shared::util::now_millis;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize)]
pub struct SalesSummary {
    pub period: String,
    pub from: i64,
    pub to: i64,
    pub revenue: f64,
    pub order_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub user_count: i64,
    pub book_count: i64,
    pub pending_orders: i64,
    pub today_revenue: f64,
}

/// Period window: "day" | "week" | "month" | "year" (default month)
pub fn period_window(period: &str, now: i64) -> (i64, i64) {
    const DAY: i64 = 86_400_000;
    let span = match period {
        "day" => DAY,
        "week" => 7 * DAY,
        "year" => 365 * DAY,
        _ => 30 * DAY,
    };
    (now - span, now)
}

pub async fn sales_summary(pool: &SqlitePool, period: &str) -> RepoResult<SalesSummary> {
    let now = now_millis();
    let (from, to) = period_window(period, now);

    let (revenue, order_count): (Option<f64>, i64) = sqlx::query_as(
        "SELECT SUM(total_amount), COUNT(*) FROM orders WHERE status = 'Completed' AND order_date BETWEEN ? AND ?",
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(SalesSummary {
        period: period.to_string(),
        from,
        to,
        revenue: revenue.unwrap_or(0.0),
        order_count,
    })
}

pub async fn top_sellers(pool: &SqlitePool, limit: i64) -> RepoResult<Vec<BookListItem>> {
    Ok(sqlx::query_as::<_, BookListItem>(
        "SELECT b.id, b.title, b.price, b.discount_price, b.stock_quantity, b.sold_quantity, b.status, p.name AS publisher_name, (SELECT image_url FROM book_image WHERE book_id = b.id AND is_main = 1 LIMIT 1) AS main_image_url FROM book b LEFT JOIN publisher p ON p.id = b.publisher_id WHERE b.sold_quantity > 0 ORDER BY b.sold_quantity DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

pub async fn low_stock(pool: &SqlitePool, threshold: i64, limit: i64) -> RepoResult<Vec<BookListItem>> {
    Ok(sqlx::query_as::<_, BookListItem>(
        "SELECT b.id, b.title, b.price, b.discount_price, b.stock_quantity, b.sold_quantity, b.status, p.name AS publisher_name, (SELECT image_url FROM book_image WHERE book_id = b.id AND is_main = 1 LIMIT 1) AS main_image_url FROM book b LEFT JOIN publisher p ON p.id = b.publisher_id WHERE b.status = 'Active' AND b.stock_quantity <= ? ORDER BY b.stock_quantity LIMIT ?",
    )
    .bind(threshold)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

pub async fn dashboard(pool: &SqlitePool) -> RepoResult<DashboardStats> {
    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user")
        .fetch_one(pool)
        .await?;
    let book_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book")
        .fetch_one(pool)
        .await?;
    let pending_orders: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = 'Pending'")
            .fetch_one(pool)
            .await?;

    let (from, to) = period_window("day", now_millis());
    let today_revenue: Option<f64> = sqlx::query_scalar(
        "SELECT SUM(total_amount) FROM orders WHERE status = 'Completed' AND order_date BETWEEN ? AND ?",
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(DashboardStats {
        user_count,
        book_count,
        pending_orders,
        today_revenue: today_revenue.unwrap_or(0.0),
    })
}
