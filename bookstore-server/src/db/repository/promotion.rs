//! Promotion Repository

use super::{RepoError, RepoResult};
use shared::models::{Promotion, PromotionCreate, PromotionUpdate};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const PROMOTION_SELECT: &str =
    "SELECT id, name, discount_type, discount_value, start_date, end_date FROM promotion";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Promotion>> {
    let sql = format!("{PROMOTION_SELECT} ORDER BY start_date DESC");
    Ok(sqlx::query_as::<_, Promotion>(&sql).fetch_all(pool).await?)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Promotion>> {
    let sql = format!("{PROMOTION_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, Promotion>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

/// Promotions active right now (for the cart page)
pub async fn list_active(pool: &SqlitePool) -> RepoResult<Vec<Promotion>> {
    let now = now_millis();
    let sql = format!(
        "{PROMOTION_SELECT} WHERE (start_date IS NULL OR start_date <= ?1) AND (end_date IS NULL OR end_date >= ?1) ORDER BY name"
    );
    Ok(sqlx::query_as::<_, Promotion>(&sql)
        .bind(now)
        .fetch_all(pool)
        .await?)
}

/// Coupon lookup: the promotion name doubles as the coupon code
pub async fn find_active_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<Promotion>> {
    let now = now_millis();
    let sql = format!(
        "{PROMOTION_SELECT} WHERE name = ?1 AND (start_date IS NULL OR start_date <= ?2) AND (end_date IS NULL OR end_date >= ?2) LIMIT 1"
    );
    Ok(sqlx::query_as::<_, Promotion>(&sql)
        .bind(name)
        .bind(now)
        .fetch_optional(pool)
        .await?)
}

fn validate_window(start: Option<i64>, end: Option<i64>) -> RepoResult<()> {
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            return Err(RepoError::Validation(
                "Promotion end date precedes start date".to_string(),
            ));
        }
    }
    Ok(())
}

pub async fn create(pool: &SqlitePool, data: PromotionCreate) -> RepoResult<Promotion> {
    validate_window(data.start_date, data.end_date)?;
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO promotion (id, name, discount_type, discount_value, start_date, end_date) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.discount_type)
    .bind(data.discount_value)
    .bind(data.start_date)
    .bind(data.end_date)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create promotion".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: PromotionUpdate) -> RepoResult<Promotion> {
    let existing = find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Promotion {id} not found")))?;
    validate_window(
        data.start_date.or(existing.start_date),
        data.end_date.or(existing.end_date),
    )?;

    sqlx::query(
        "UPDATE promotion SET name = COALESCE(?1, name), discount_type = COALESCE(?2, discount_type), discount_value = COALESCE(?3, discount_value), start_date = COALESCE(?4, start_date), end_date = COALESCE(?5, end_date) WHERE id = ?6",
    )
    .bind(&data.name)
    .bind(&data.discount_type)
    .bind(data.discount_value)
    .bind(data.start_date)
    .bind(data.end_date)
    .bind(id)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Promotion {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM promotion WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn coupon_lookup_respects_window() {
        let db = DbService::in_memory().await.unwrap();
        let now = now_millis();

        create(
            &db.pool,
            PromotionCreate {
                name: "SUMMER".to_string(),
                discount_type: "Percent".to_string(),
                discount_value: 10.0,
                start_date: Some(now - 1_000),
                end_date: Some(now + 1_000),
            },
        )
        .await
        .unwrap();
        create(
            &db.pool,
            PromotionCreate {
                name: "EXPIRED".to_string(),
                discount_type: "Amount".to_string(),
                discount_value: 5.0,
                start_date: Some(now - 10_000),
                end_date: Some(now - 5_000),
            },
        )
        .await
        .unwrap();

        assert!(find_active_by_name(&db.pool, "SUMMER")
            .await
            .unwrap()
            .is_some());
        assert!(find_active_by_name(&db.pool, "EXPIRED")
            .await
            .unwrap()
            .is_none());
        assert_eq!(list_active(&db.pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_inverted_window() {
        let db = DbService::in_memory().await.unwrap();
        let err = create(
            &db.pool,
            PromotionCreate {
                name: "BAD".to_string(),
                discount_type: "Amount".to_string(),
                discount_value: 1.0,
                start_date: Some(100),
                end_date: Some(50),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }
}
