//! Notification Repository

use super::{page_bounds, RepoResult};
use shared::models::Notification;
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const NOTIFICATION_SELECT: &str =
    "SELECT id, user_id, title, message, kind, redirect_url, is_read, created_at FROM notification";

pub async fn insert(
    pool: &SqlitePool,
    user_id: i64,
    title: &str,
    message: &str,
    kind: Option<&str>,
    redirect_url: Option<&str>,
) -> RepoResult<i64> {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO notification (id, user_id, title, message, kind, redirect_url, is_read, created_at) VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(id)
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(kind)
    .bind(redirect_url)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(id)
}

/// 刷新页面时用于去重（同一订单的成功通知只发一次）
pub async fn exists_with_message(
    pool: &SqlitePool,
    title: &str,
    message_like: &str,
) -> RepoResult<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notification WHERE title = ? AND message LIKE ?",
    )
    .bind(title)
    .bind(message_like)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: i64,
    page: i64,
    page_size: i64,
) -> RepoResult<(Vec<Notification>, i64)> {
    let (limit, offset) = page_bounds(page, page_size);
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notification WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    let sql = format!(
        "{NOTIFICATION_SELECT} WHERE user_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
    );
    let rows = sqlx::query_as::<_, Notification>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok((rows, total))
}

pub async fn find_for_user(
    pool: &SqlitePool,
    user_id: i64,
    id: i64,
) -> RepoResult<Option<Notification>> {
    let sql = format!("{NOTIFICATION_SELECT} WHERE id = ? AND user_id = ?");
    Ok(sqlx::query_as::<_, Notification>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn unread_count(pool: &SqlitePool, user_id: i64) -> RepoResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notification WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn mark_read(pool: &SqlitePool, user_id: i64, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE notification SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn mark_all_read(pool: &SqlitePool, user_id: i64) -> RepoResult<i64> {
    let rows = sqlx::query("UPDATE notification SET is_read = 1 WHERE user_id = ? AND is_read = 0")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() as i64)
}
