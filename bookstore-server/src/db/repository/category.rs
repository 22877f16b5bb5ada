//! Category Repository

use super::{RepoError, RepoResult};
use shared::models::{Category, CategoryCreate, CategoryUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const CATEGORY_SELECT: &str = "SELECT id, name, parent_id, description, created_at FROM category";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Category>> {
    let sql = format!("{CATEGORY_SELECT} ORDER BY parent_id IS NOT NULL, name");
    Ok(sqlx::query_as::<_, Category>(&sql).fetch_all(pool).await?)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Category>> {
    let sql = format!("{CATEGORY_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn create(pool: &SqlitePool, data: CategoryCreate) -> RepoResult<Category> {
    if let Some(parent_id) = data.parent_id {
        if find_by_id(pool, parent_id).await?.is_none() {
            return Err(RepoError::Validation(format!(
                "Parent category {parent_id} does not exist"
            )));
        }
    }

    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO category (id, name, parent_id, description, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(data.parent_id)
    .bind(&data.description)
    .bind(now_millis())
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create category".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: CategoryUpdate) -> RepoResult<Category> {
    // A category cannot become its own parent
    if data.parent_id == Some(id) {
        return Err(RepoError::Validation(
            "Category cannot be its own parent".to_string(),
        ));
    }

    let rows = sqlx::query(
        "UPDATE category SET name = COALESCE(?1, name), parent_id = COALESCE(?2, parent_id), description = COALESCE(?3, description) WHERE id = ?4",
    )
    .bind(&data.name)
    .bind(data.parent_id)
    .bind(&data.description)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Category {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Category {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let children: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM category WHERE parent_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if children > 0 {
        return Err(RepoError::Business(
            "Category has sub-categories and cannot be deleted".to_string(),
        ));
    }

    let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_category WHERE category_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if books > 0 {
        return Err(RepoError::Business(
            "Category has books and cannot be deleted".to_string(),
        ));
    }

    let rows = sqlx::query("DELETE FROM category WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
