//! Shipping Method Repository

use super::{RepoError, RepoResult};
use shared::models::{ShippingMethod, ShippingMethodCreate, ShippingMethodUpdate};
use shared::util::snowflake_id;
use sqlx::SqlitePool;

const METHOD_SELECT: &str = "SELECT id, name, price, estimated_days FROM shipping_method";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<ShippingMethod>> {
    let sql = format!("{METHOD_SELECT} ORDER BY price");
    Ok(sqlx::query_as::<_, ShippingMethod>(&sql)
        .fetch_all(pool)
        .await?)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<ShippingMethod>> {
    let sql = format!("{METHOD_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, ShippingMethod>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

/// The baseline fee shown on the cart page
pub async fn standard(pool: &SqlitePool) -> RepoResult<Option<ShippingMethod>> {
    let sql = format!("{METHOD_SELECT} WHERE name LIKE '%Standard%' LIMIT 1");
    Ok(sqlx::query_as::<_, ShippingMethod>(&sql)
        .fetch_optional(pool)
        .await?)
}

pub async fn create(pool: &SqlitePool, data: ShippingMethodCreate) -> RepoResult<ShippingMethod> {
    let id = snowflake_id();
    sqlx::query("INSERT INTO shipping_method (id, name, price, estimated_days) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(&data.name)
        .bind(data.price)
        .bind(data.estimated_days)
        .execute(pool)
        .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create shipping method".into()))
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    data: ShippingMethodUpdate,
) -> RepoResult<ShippingMethod> {
    let rows = sqlx::query(
        "UPDATE shipping_method SET name = COALESCE(?1, name), price = COALESCE(?2, price), estimated_days = COALESCE(?3, estimated_days) WHERE id = ?4",
    )
    .bind(&data.name)
    .bind(data.price)
    .bind(data.estimated_days)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Shipping method {id} not found"
        )));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Shipping method {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM shipping_method WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
