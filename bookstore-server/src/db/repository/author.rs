//! Author Repository

use super::{RepoError, RepoResult};
use shared::models::{Author, AuthorCreate, AuthorUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

pub async fn find_all(pool: &SqlitePool, search: &str) -> RepoResult<Vec<Author>> {
    let pattern = format!("%{search}%");
    Ok(sqlx::query_as::<_, Author>(
        "SELECT id, name, bio, created_at FROM author WHERE name LIKE ? ORDER BY name",
    )
    .bind(&pattern)
    .fetch_all(pool)
    .await?)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Author>> {
    Ok(sqlx::query_as::<_, Author>(
        "SELECT id, name, bio, created_at FROM author WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

pub async fn create(pool: &SqlitePool, data: AuthorCreate) -> RepoResult<Author> {
    let id = snowflake_id();
    sqlx::query("INSERT INTO author (id, name, bio, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(&data.name)
        .bind(&data.bio)
        .bind(now_millis())
        .execute(pool)
        .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create author".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: AuthorUpdate) -> RepoResult<Author> {
    let rows = sqlx::query(
        "UPDATE author SET name = COALESCE(?1, name), bio = COALESCE(?2, bio) WHERE id = ?3",
    )
    .bind(&data.name)
    .bind(&data.bio)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Author {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Author {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let referenced: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_author WHERE author_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if referenced > 0 {
        return Err(RepoError::Business(
            "Author is linked to books and cannot be deleted".to_string(),
        ));
    }

    let rows = sqlx::query("DELETE FROM author WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
