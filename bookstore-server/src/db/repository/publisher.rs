//! Publisher Repository

use super::{RepoError, RepoResult};
use shared::models::{Publisher, PublisherCreate, PublisherUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

pub async fn find_all(pool: &SqlitePool, search: &str) -> RepoResult<Vec<Publisher>> {
    let pattern = format!("%{search}%");
    Ok(sqlx::query_as::<_, Publisher>(
        "SELECT id, name, address, phone, created_at FROM publisher WHERE name LIKE ? ORDER BY name",
    )
    .bind(&pattern)
    .fetch_all(pool)
    .await?)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Publisher>> {
    Ok(sqlx::query_as::<_, Publisher>(
        "SELECT id, name, address, phone, created_at FROM publisher WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

pub async fn create(pool: &SqlitePool, data: PublisherCreate) -> RepoResult<Publisher> {
    let id = snowflake_id();
    sqlx::query("INSERT INTO publisher (id, name, address, phone, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(&data.name)
        .bind(&data.address)
        .bind(&data.phone)
        .bind(now_millis())
        .execute(pool)
        .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create publisher".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: PublisherUpdate) -> RepoResult<Publisher> {
    let rows = sqlx::query(
        "UPDATE publisher SET name = COALESCE(?1, name), address = COALESCE(?2, address), phone = COALESCE(?3, phone) WHERE id = ?4",
    )
    .bind(&data.name)
    .bind(&data.address)
    .bind(&data.phone)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Publisher {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Publisher {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let referenced: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book WHERE publisher_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if referenced > 0 {
        return Err(RepoError::Business(
            "Publisher has books and cannot be deleted".to_string(),
        ));
    }

    let rows = sqlx::query("DELETE FROM publisher WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
