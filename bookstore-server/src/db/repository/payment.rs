//! Payment Repository

use super::{page_bounds, RepoError, RepoResult};
use shared::models::{Payment, PaymentSetting, PaymentSettingUpdate, PaymentStatus};
use shared::util::now_millis;
use sqlx::SqlitePool;

const PAYMENT_SELECT: &str =
    "SELECT id, order_id, payment_date, amount, status, transaction_code FROM payment";

pub async fn find_by_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Option<Payment>> {
    let sql = format!("{PAYMENT_SELECT} WHERE order_id = ? LIMIT 1");
    Ok(sqlx::query_as::<_, Payment>(&sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn list(
    pool: &SqlitePool,
    status: Option<PaymentStatus>,
    page: i64,
    page_size: i64,
) -> RepoResult<(Vec<Payment>, i64)> {
    let (limit, offset) = page_bounds(page, page_size);

    let (total, payments) = match status {
        Some(status) => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment WHERE status = ?")
                .bind(status)
                .fetch_one(pool)
                .await?;
            let sql = format!(
                "{PAYMENT_SELECT} WHERE status = ? ORDER BY payment_date DESC LIMIT ? OFFSET ?"
            );
            let payments = sqlx::query_as::<_, Payment>(&sql)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            (total, payments)
        }
        None => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment")
                .fetch_one(pool)
                .await?;
            let sql = format!("{PAYMENT_SELECT} ORDER BY payment_date DESC LIMIT ? OFFSET ?");
            let payments = sqlx::query_as::<_, Payment>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            (total, payments)
        }
    };

    Ok((payments, total))
}

/// Mark an order's payment as paid. Idempotent: an already-paid payment
/// is left untouched and the call reports `false`.
pub async fn mark_paid(
    pool: &SqlitePool,
    order_id: i64,
    transaction_code: Option<&str>,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE payment SET status = 'Paid', payment_date = ?, transaction_code = COALESCE(?, transaction_code) WHERE order_id = ? AND status != 'Paid'",
    )
    .bind(now_millis())
    .bind(transaction_code)
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn update_status(
    pool: &SqlitePool,
    payment_id: i64,
    status: PaymentStatus,
) -> RepoResult<Payment> {
    let rows = sqlx::query("UPDATE payment SET status = ? WHERE id = ?")
        .bind(status)
        .bind(payment_id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Payment {payment_id} not found"
        )));
    }
    let sql = format!("{PAYMENT_SELECT} WHERE id = ?");
    sqlx::query_as::<_, Payment>(&sql)
        .bind(payment_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Payment {payment_id} not found")))
}

// ========== Payment settings ==========

const SETTING_SELECT: &str = "SELECT id, method_name, is_enabled, bank_name, account_number, account_holder, bank_code, description FROM payment_setting";

pub async fn settings(pool: &SqlitePool) -> RepoResult<Vec<PaymentSetting>> {
    let sql = format!("{SETTING_SELECT} ORDER BY id");
    Ok(sqlx::query_as::<_, PaymentSetting>(&sql)
        .fetch_all(pool)
        .await?)
}

pub async fn enabled_settings(pool: &SqlitePool) -> RepoResult<Vec<PaymentSetting>> {
    let sql = format!("{SETTING_SELECT} WHERE is_enabled = 1 ORDER BY id");
    Ok(sqlx::query_as::<_, PaymentSetting>(&sql)
        .fetch_all(pool)
        .await?)
}

/// Bank-transfer channel details for the payment page
pub async fn bank_transfer_setting(pool: &SqlitePool) -> RepoResult<Option<PaymentSetting>> {
    let sql = format!("{SETTING_SELECT} WHERE method_name = 'Bank Transfer' AND is_enabled = 1");
    Ok(sqlx::query_as::<_, PaymentSetting>(&sql)
        .fetch_optional(pool)
        .await?)
}

pub async fn update_setting(
    pool: &SqlitePool,
    id: i64,
    data: PaymentSettingUpdate,
) -> RepoResult<PaymentSetting> {
    let rows = sqlx::query(
        "UPDATE payment_setting SET is_enabled = COALESCE(?1, is_enabled), bank_name = COALESCE(?2, bank_name), account_number = COALESCE(?3, account_number), account_holder = COALESCE(?4, account_holder), bank_code = COALESCE(?5, bank_code), description = COALESCE(?6, description) WHERE id = ?7",
    )
    .bind(data.is_enabled)
    .bind(&data.bank_name)
    .bind(&data.account_number)
    .bind(&data.account_holder)
    .bind(&data.bank_code)
    .bind(&data.description)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Payment setting {id} not found")));
    }
    let sql = format!("{SETTING_SELECT} WHERE id = ?");
    sqlx::query_as::<_, PaymentSetting>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Payment setting {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::util::snowflake_id;

    async fn seed_payment(pool: &SqlitePool) -> i64 {
        // Minimal fixture: an order row is required by the FK
        let user_id = snowflake_id();
        sqlx::query(
            "INSERT INTO user (id, full_name, email, password_hash, created_at) VALUES (?, 'U', 'u@x.com', 'h', 0)",
        )
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
        let order_id = snowflake_id();
        sqlx::query(
            "INSERT INTO orders (id, user_id, order_date, total_amount, status, payment_method, shipping_address, shipping_method_name) VALUES (?, ?, 0, 100.0, 'Pending', 'Bank Transfer', 'a', 'Standard')",
        )
        .bind(order_id)
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO payment (id, order_id, payment_date, amount, status) VALUES (?, ?, 0, 100.0, 'Pending')",
        )
        .bind(snowflake_id())
        .bind(order_id)
        .execute(pool)
        .await
        .unwrap();
        order_id
    }

    #[tokio::test]
    async fn mark_paid_is_idempotent() {
        let db = DbService::in_memory().await.unwrap();
        let order_id = seed_payment(&db.pool).await;

        assert!(mark_paid(&db.pool, order_id, Some("TX1")).await.unwrap());
        // Second webhook delivery: no-op
        assert!(!mark_paid(&db.pool, order_id, Some("TX2")).await.unwrap());

        let p = find_by_order(&db.pool, order_id).await.unwrap().unwrap();
        assert_eq!(p.status, PaymentStatus::Paid);
        assert_eq!(p.transaction_code.as_deref(), Some("TX1"));
    }
}
