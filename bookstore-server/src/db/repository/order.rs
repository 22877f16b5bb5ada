//! Order Repository
//!
//! Checkout writes the order aggregate (order + payment + shipping +
//! details) in one transaction. Stock/sold counters move exactly once,
//! on the transition into `Completed`.

use super::{page_bounds, RepoError, RepoResult};
use crate::cart::Cart;
use shared::models::{Order, OrderDetailRow, OrderStatus, OrderWithUser, Shipping};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const ORDER_SELECT: &str = "SELECT id, user_id, order_date, total_amount, status, payment_method, shipping_address, shipping_method_name, shipping_fee FROM orders";

const ORDER_WITH_USER_SELECT: &str = "SELECT o.id, o.user_id, o.order_date, o.total_amount, o.status, o.payment_method, o.shipping_address, o.shipping_method_name, o.shipping_fee, u.full_name AS user_name, u.email AS user_email FROM orders o JOIN user u ON u.id = o.user_id";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_with_user(pool: &SqlitePool, id: i64) -> RepoResult<Option<OrderWithUser>> {
    let sql = format!("{ORDER_WITH_USER_SELECT} WHERE o.id = ?");
    Ok(sqlx::query_as::<_, OrderWithUser>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn details_of(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderDetailRow>> {
    Ok(sqlx::query_as::<_, OrderDetailRow>(
        "SELECT d.id, d.order_id, d.book_id, d.quantity, d.unit_price, b.title AS book_title, (SELECT image_url FROM book_image WHERE book_id = b.id AND is_main = 1 LIMIT 1) AS image_url FROM order_detail d JOIN book b ON b.id = d.book_id WHERE d.order_id = ? ORDER BY d.id",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?)
}

pub async fn shipping_of(pool: &SqlitePool, order_id: i64) -> RepoResult<Option<Shipping>> {
    Ok(sqlx::query_as::<_, Shipping>(
        "SELECT id, order_id, shipping_company, tracking_number, status FROM shipping WHERE order_id = ? LIMIT 1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?)
}

/// Create the whole order aggregate atomically and return the order id.
///
/// 订单 + 支付 + 物流 + 明细同一事务落库；任何一步失败整体回滚。
pub async fn place_order(
    pool: &SqlitePool,
    user_id: i64,
    cart: &Cart,
    shipping_address: &str,
    payment_method: &str,
    shipping_method_name: &str,
    shipping_fee: f64,
) -> RepoResult<i64> {
    if cart.is_empty() {
        return Err(RepoError::Validation("Cart is empty".to_string()));
    }

    let now = now_millis();
    let order_id = snowflake_id();
    let total_amount = cart.final_total() + shipping_fee;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO orders (id, user_id, order_date, total_amount, status, payment_method, shipping_address, shipping_method_name, shipping_fee) VALUES (?, ?, ?, ?, 'Pending', ?, ?, ?, ?)",
    )
    .bind(order_id)
    .bind(user_id)
    .bind(now)
    .bind(total_amount)
    .bind(payment_method)
    .bind(shipping_address)
    .bind(shipping_method_name)
    .bind(shipping_fee)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO payment (id, order_id, payment_date, amount, status) VALUES (?, ?, ?, ?, 'Pending')",
    )
    .bind(snowflake_id())
    .bind(order_id)
    .bind(now)
    .bind(total_amount)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO shipping (id, order_id, shipping_company, status) VALUES (?, ?, ?, 'Pending')",
    )
    .bind(snowflake_id())
    .bind(order_id)
    .bind(shipping_method_name)
    .execute(&mut *tx)
    .await?;

    for item in &cart.items {
        sqlx::query(
            "INSERT INTO order_detail (id, order_id, book_id, quantity, unit_price) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(snowflake_id())
        .bind(order_id)
        .bind(item.book_id)
        .bind(item.quantity)
        .bind(item.current_price())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(order_id)
}

pub async fn history_for_user(
    pool: &SqlitePool,
    user_id: i64,
    status: Option<OrderStatus>,
    page: i64,
    page_size: i64,
) -> RepoResult<(Vec<Order>, i64)> {
    let (limit, offset) = page_bounds(page, page_size);

    let (total, orders) = match status {
        Some(status) => {
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM orders WHERE user_id = ? AND status = ?",
            )
            .bind(user_id)
            .bind(status)
            .fetch_one(pool)
            .await?;
            let sql = format!(
                "{ORDER_SELECT} WHERE user_id = ? AND status = ? ORDER BY order_date DESC LIMIT ? OFFSET ?"
            );
            let orders = sqlx::query_as::<_, Order>(&sql)
                .bind(user_id)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            (total, orders)
        }
        None => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(pool)
                .await?;
            let sql =
                format!("{ORDER_SELECT} WHERE user_id = ? ORDER BY order_date DESC LIMIT ? OFFSET ?");
            let orders = sqlx::query_as::<_, Order>(&sql)
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            (total, orders)
        }
    };

    Ok((orders, total))
}

pub async fn list(
    pool: &SqlitePool,
    status: Option<OrderStatus>,
    page: i64,
    page_size: i64,
) -> RepoResult<(Vec<OrderWithUser>, i64)> {
    let (limit, offset) = page_bounds(page, page_size);

    let (total, orders) = match status {
        Some(status) => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = ?")
                .bind(status)
                .fetch_one(pool)
                .await?;
            let sql = format!(
                "{ORDER_WITH_USER_SELECT} WHERE o.status = ? ORDER BY o.order_date DESC LIMIT ? OFFSET ?"
            );
            let orders = sqlx::query_as::<_, OrderWithUser>(&sql)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            (total, orders)
        }
        None => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
                .fetch_one(pool)
                .await?;
            let sql =
                format!("{ORDER_WITH_USER_SELECT} ORDER BY o.order_date DESC LIMIT ? OFFSET ?");
            let orders = sqlx::query_as::<_, OrderWithUser>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?;
            (total, orders)
        }
    };

    Ok((orders, total))
}

/// Recent orders for the admin dashboard
pub async fn recent(pool: &SqlitePool, limit: i64) -> RepoResult<Vec<OrderWithUser>> {
    let sql = format!("{ORDER_WITH_USER_SELECT} ORDER BY o.order_date DESC LIMIT ?");
    Ok(sqlx::query_as::<_, OrderWithUser>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

/// Update order status, returning `(old_status, stock_deducted)`.
///
/// 库存只在首次转入 Completed 时扣减（卖出数 +，库存 -，写台账）。
/// 重复置为 Completed 不会再次扣减。
pub async fn update_status(
    pool: &SqlitePool,
    order_id: i64,
    new_status: OrderStatus,
) -> RepoResult<(OrderStatus, bool)> {
    let mut tx = pool.begin().await?;

    let old_status: Option<OrderStatus> =
        sqlx::query_scalar("SELECT status FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
    let old_status =
        old_status.ok_or_else(|| RepoError::NotFound(format!("Order {order_id} not found")))?;

    sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
        .bind(new_status)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

    let deduct = new_status == OrderStatus::Completed && old_status != OrderStatus::Completed;
    if deduct {
        let details: Vec<(i64, i64)> =
            sqlx::query_as("SELECT book_id, quantity FROM order_detail WHERE order_id = ?")
                .bind(order_id)
                .fetch_all(&mut *tx)
                .await?;

        let now = now_millis();
        for (book_id, quantity) in details {
            sqlx::query(
                "UPDATE book SET stock_quantity = stock_quantity - ?1, sold_quantity = sold_quantity + ?1 WHERE id = ?2",
            )
            .bind(quantity)
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO inventory_log (id, book_id, change_quantity, reason, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(snowflake_id())
            .bind(book_id)
            .bind(-quantity)
            .bind(format!("Order #{order_id} delivered"))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok((old_status, deduct))
}

/// Upsert the shipping record (company + tracking number)
pub async fn update_shipping(
    pool: &SqlitePool,
    order_id: i64,
    shipping_company: &str,
    tracking_number: &str,
) -> RepoResult<Shipping> {
    let existing = shipping_of(pool, order_id).await?;
    match existing {
        Some(s) => {
            sqlx::query(
                "UPDATE shipping SET shipping_company = ?, tracking_number = ? WHERE id = ?",
            )
            .bind(shipping_company)
            .bind(tracking_number)
            .bind(s.id)
            .execute(pool)
            .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO shipping (id, order_id, shipping_company, tracking_number, status) VALUES (?, ?, ?, ?, 'Shipping')",
            )
            .bind(snowflake_id())
            .bind(order_id)
            .bind(shipping_company)
            .bind(tracking_number)
            .execute(pool)
            .await?;
        }
    }
    shipping_of(pool, order_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to save shipping".into()))
}

/// Delete an abandoned unpaid order and everything hanging off it.
///
/// Called when the customer returns to the cart while a bank-transfer
/// order is still pending. Paid orders are left untouched.
pub async fn delete_if_unpaid(pool: &SqlitePool, order_id: i64) -> RepoResult<bool> {
    let paid: Option<i64> = sqlx::query_scalar(
        "SELECT COUNT(*) FROM payment WHERE order_id = ? AND status = 'Paid'",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?;
    if paid.unwrap_or(0) > 0 {
        return Ok(false);
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM order_detail WHERE order_id = ?")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM shipping WHERE order_id = ?")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM payment WHERE order_id = ?")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM notification WHERE message LIKE ?")
        .bind(format!("%#{order_id}%"))
        .execute(&mut *tx)
        .await?;
    let rows = sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{book, payment, user};
    use crate::db::DbService;
    use shared::models::{BookCreate, PaymentStatus};

    async fn seed(pool: &SqlitePool) -> (i64, i64) {
        let u = user::create(pool, "Buyer", "buyer@example.com", None, "h", true)
            .await
            .unwrap();
        let b = book::create(
            pool,
            BookCreate {
                title: "Stock Test".to_string(),
                isbn: None,
                price: 100.0,
                discount_price: None,
                description: None,
                publish_year: None,
                page_count: None,
                cover_type: None,
                stock_quantity: 10,
                publisher_id: None,
                author_ids: vec![],
                category_ids: vec![],
                image_urls: vec![],
            },
        )
        .await
        .unwrap();
        (u.id, b.id)
    }

    fn cart_with(book_id: i64, quantity: i64) -> Cart {
        let mut cart = Cart::default();
        cart.items.push(crate::cart::CartItem {
            book_id,
            title: "Stock Test".to_string(),
            price: 100.0,
            discount_price: None,
            image_url: None,
            quantity,
        });
        cart
    }

    #[tokio::test]
    async fn place_order_creates_whole_aggregate() {
        let db = DbService::in_memory().await.unwrap();
        let (user_id, book_id) = seed(&db.pool).await;

        let order_id = place_order(
            &db.pool,
            user_id,
            &cart_with(book_id, 2),
            "12 Main St",
            "COD",
            "Standard",
            30.0,
        )
        .await
        .unwrap();

        let order = find_by_id(&db.pool, order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, 230.0);

        assert_eq!(details_of(&db.pool, order_id).await.unwrap().len(), 1);
        assert!(shipping_of(&db.pool, order_id).await.unwrap().is_some());
        let pay = payment::find_by_order(&db.pool, order_id).await.unwrap();
        assert_eq!(pay.unwrap().status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn stock_deducted_exactly_once() {
        let db = DbService::in_memory().await.unwrap();
        let (user_id, book_id) = seed(&db.pool).await;
        let order_id = place_order(
            &db.pool,
            user_id,
            &cart_with(book_id, 3),
            "addr",
            "COD",
            "Standard",
            0.0,
        )
        .await
        .unwrap();

        // Pending -> Confirmed: no stock movement
        let (_, deducted) = update_status(&db.pool, order_id, OrderStatus::Confirmed)
            .await
            .unwrap();
        assert!(!deducted);

        // Confirmed -> Completed: deduct once
        let (_, deducted) = update_status(&db.pool, order_id, OrderStatus::Completed)
            .await
            .unwrap();
        assert!(deducted);

        let b = book::find_by_id(&db.pool, book_id).await.unwrap().unwrap();
        assert_eq!(b.stock_quantity, 7);
        assert_eq!(b.sold_quantity, 3);

        // Completed -> Completed again: no double deduction
        let (_, deducted) = update_status(&db.pool, order_id, OrderStatus::Completed)
            .await
            .unwrap();
        assert!(!deducted);

        let b = book::find_by_id(&db.pool, book_id).await.unwrap().unwrap();
        assert_eq!(b.stock_quantity, 7);
        assert_eq!(b.sold_quantity, 3);
    }

    #[tokio::test]
    async fn abandoned_unpaid_order_is_cleaned_up() {
        let db = DbService::in_memory().await.unwrap();
        let (user_id, book_id) = seed(&db.pool).await;
        let order_id = place_order(
            &db.pool,
            user_id,
            &cart_with(book_id, 1),
            "addr",
            "Bank Transfer",
            "Standard",
            0.0,
        )
        .await
        .unwrap();

        assert!(delete_if_unpaid(&db.pool, order_id).await.unwrap());
        assert!(find_by_id(&db.pool, order_id).await.unwrap().is_none());
        assert!(details_of(&db.pool, order_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paid_order_survives_cleanup() {
        let db = DbService::in_memory().await.unwrap();
        let (user_id, book_id) = seed(&db.pool).await;
        let order_id = place_order(
            &db.pool,
            user_id,
            &cart_with(book_id, 1),
            "addr",
            "Bank Transfer",
            "Standard",
            0.0,
        )
        .await
        .unwrap();

        payment::mark_paid(&db.pool, order_id, None).await.unwrap();
        assert!(!delete_if_unpaid(&db.pool, order_id).await.unwrap());
        assert!(find_by_id(&db.pool, order_id).await.unwrap().is_some());
    }
}
