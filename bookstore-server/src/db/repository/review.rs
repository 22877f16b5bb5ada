//! Review Repository

use super::{page_bounds, RepoError, RepoResult};
use shared::models::{Review, ReviewCreate, ReviewRow};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const ROW_SELECT: &str = "SELECT r.id, r.book_id, r.user_id, r.rating, r.comment, r.created_at, u.full_name AS user_name, b.title AS book_title FROM review r JOIN user u ON u.id = r.user_id JOIN book b ON b.id = r.book_id";

pub async fn create(pool: &SqlitePool, user_id: i64, data: ReviewCreate) -> RepoResult<Review> {
    if !(1..=5).contains(&data.rating) {
        return Err(RepoError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO review (id, book_id, user_id, rating, comment, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(data.book_id)
    .bind(user_id)
    .bind(data.rating)
    .bind(&data.comment)
    .bind(now_millis())
    .execute(pool)
    .await?;

    let review = sqlx::query_as::<_, Review>(
        "SELECT id, book_id, user_id, rating, comment, created_at FROM review WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    review.ok_or_else(|| RepoError::Database("Failed to create review".into()))
}

pub async fn for_book(pool: &SqlitePool, book_id: i64) -> RepoResult<Vec<ReviewRow>> {
    let sql = format!("{ROW_SELECT} WHERE r.book_id = ? ORDER BY r.created_at DESC");
    Ok(sqlx::query_as::<_, ReviewRow>(&sql)
        .bind(book_id)
        .fetch_all(pool)
        .await?)
}

pub async fn average_rating(pool: &SqlitePool, book_id: i64) -> RepoResult<Option<f64>> {
    let avg: Option<f64> = sqlx::query_scalar("SELECT AVG(rating) FROM review WHERE book_id = ?")
        .bind(book_id)
        .fetch_one(pool)
        .await?;
    Ok(avg)
}

pub async fn list(
    pool: &SqlitePool,
    page: i64,
    page_size: i64,
) -> RepoResult<(Vec<ReviewRow>, i64)> {
    let (limit, offset) = page_bounds(page, page_size);
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM review")
        .fetch_one(pool)
        .await?;
    let sql = format!("{ROW_SELECT} ORDER BY r.created_at DESC LIMIT ? OFFSET ?");
    let rows = sqlx::query_as::<_, ReviewRow>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok((rows, total))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM review WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
