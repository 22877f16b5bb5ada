//! Inventory Repository

use super::{page_bounds, RepoError, RepoResult};
use shared::models::{BookListItem, InventoryLogRow};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

/// Stock-ordered book list for the inventory screen (lowest stock first)
pub async fn stock_page(
    pool: &SqlitePool,
    search: &str,
    page: i64,
    page_size: i64,
) -> RepoResult<(Vec<BookListItem>, i64)> {
    let (limit, offset) = page_bounds(page, page_size);
    let pattern = format!("%{search}%");

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM book WHERE title LIKE ?1 OR isbn LIKE ?1")
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

    let items = sqlx::query_as::<_, BookListItem>(
        "SELECT b.id, b.title, b.price, b.discount_price, b.stock_quantity, b.sold_quantity, b.status, p.name AS publisher_name, (SELECT image_url FROM book_image WHERE book_id = b.id AND is_main = 1 LIMIT 1) AS main_image_url FROM book b LEFT JOIN publisher p ON p.id = b.publisher_id WHERE b.title LIKE ?1 OR b.isbn LIKE ?1 ORDER BY b.stock_quantity, b.title LIMIT ?2 OFFSET ?3",
    )
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((items, total))
}

/// Latest movements for one book
pub async fn logs_for_book(
    pool: &SqlitePool,
    book_id: i64,
    limit: i64,
) -> RepoResult<Vec<InventoryLogRow>> {
    Ok(sqlx::query_as::<_, InventoryLogRow>(
        "SELECT l.id, l.book_id, l.change_quantity, l.reason, l.created_at, b.title AS book_title FROM inventory_log l JOIN book b ON b.id = l.book_id WHERE l.book_id = ? ORDER BY l.created_at DESC LIMIT ?",
    )
    .bind(book_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

/// Set absolute stock; the delta plus reason is recorded in the log.
pub async fn set_stock(
    pool: &SqlitePool,
    book_id: i64,
    quantity: i64,
    reason: Option<&str>,
) -> RepoResult<i64> {
    let mut tx = pool.begin().await?;

    let current: Option<i64> = sqlx::query_scalar("SELECT stock_quantity FROM book WHERE id = ?")
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?;
    let current = current.ok_or_else(|| RepoError::NotFound(format!("Book {book_id} not found")))?;

    let delta = quantity - current;
    sqlx::query("UPDATE book SET stock_quantity = ? WHERE id = ?")
        .bind(quantity)
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO inventory_log (id, book_id, change_quantity, reason, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(snowflake_id())
    .bind(book_id)
    .bind(delta)
    .bind(reason.unwrap_or("Manual update"))
    .bind(now_millis())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::book;
    use crate::db::DbService;
    use shared::models::BookCreate;

    #[tokio::test]
    async fn set_stock_records_delta() {
        let db = DbService::in_memory().await.unwrap();
        let b = book::create(
            &db.pool,
            BookCreate {
                title: "Ledger".to_string(),
                isbn: None,
                price: 10.0,
                discount_price: None,
                description: None,
                publish_year: None,
                page_count: None,
                cover_type: None,
                stock_quantity: 4,
                publisher_id: None,
                author_ids: vec![],
                category_ids: vec![],
                image_urls: vec![],
            },
        )
        .await
        .unwrap();

        let delta = set_stock(&db.pool, b.id, 10, Some("Restock")).await.unwrap();
        assert_eq!(delta, 6);

        let logs = logs_for_book(&db.pool, b.id, 50).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].change_quantity, 6);
        assert_eq!(logs[0].reason.as_deref(), Some("Restock"));
    }
}
