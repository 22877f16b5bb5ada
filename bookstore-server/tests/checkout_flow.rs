//! End-to-end storefront flow: cart → checkout → payment webhook →
//! admin status transitions with exactly-once stock deduction.

mod common;

use common::{login_as, open_session, send, test_app};
use http::{Method, StatusCode};

use bookstore_server::db::repository::chat;
use shared::chat::MessageKind;

async fn create_book(app: &axum::Router, admin_token: &str, stock: i64) -> i64 {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/api/admin/books",
        Some(admin_token),
        Some(serde_json::json!({
            "title": "The Rust Book",
            "price": 100.0,
            "discount_price": 80.0,
            "stock_quantity": stock,
            "image_urls": ["/img/rust.png"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_i64().expect("book id")
}

#[tokio::test]
async fn cart_survives_login_and_checkout_clears_it() {
    let (app, state) = test_app().await;
    let admin = login_as(&app, &state, "admin@example.com", "Admin").await;
    let book_id = create_book(&app, &admin, 10).await;

    // Anonymous cart
    let token = open_session(&app).await;
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/cart/items",
        Some(&token),
        Some(serde_json::json!({ "book_id": book_id, "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart_count"], serde_json::json!(2));

    // Checkout requires login
    let (status, _, _) = send(&app, Method::GET, "/api/cart/checkout", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Login on the same session keeps the cart
    let hash = bookstore_server::auth::hash_password("password123").unwrap();
    let u = bookstore_server::db::repository::user::create(
        &state.pool,
        "Buyer",
        "buyer@example.com",
        None,
        &hash,
        true,
    )
    .await
    .unwrap();
    bookstore_server::db::repository::user::assign_role_by_name(&state.pool, u.id, "Customer")
        .await
        .unwrap();
    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/account/login",
        Some(&token),
        Some(serde_json::json!({ "email": "buyer@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, cart) = send(&app, Method::GET, "/api/cart", Some(&token), None).await;
    assert_eq!(cart["total_quantity"], serde_json::json!(2));
    // Discount price wins: 2 × 80
    assert_eq!(cart["subtotal"], serde_json::json!(160.0));

    // Place a COD order
    let (status, _, placed) = send(
        &app,
        Method::POST,
        "/api/cart/checkout",
        Some(&token),
        Some(serde_json::json!({
            "shipping_address": "Alice | 0900 | 12 Main St",
            "payment_method": "COD",
            "shipping_method_id": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(placed["next"], serde_json::json!("success"));
    let order_id = placed["order_id"].as_i64().unwrap();

    // Success view clears the cart
    let (status, _, _) = send(
        &app,
        Method::GET,
        &format!("/api/cart/orders/{order_id}/success"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, _, cart) = send(&app, Method::GET, "/api/cart", Some(&token), None).await;
    assert_eq!(cart["total_quantity"], serde_json::json!(0));

    // Customer sees the order in history
    let (status, _, history) = send(&app, Method::GET, "/api/orders", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], serde_json::json!(1));
}

#[tokio::test]
async fn webhook_marks_paid_once_and_stock_deducts_once() {
    let (app, state) = test_app().await;
    let admin = login_as(&app, &state, "admin@example.com", "Admin").await;
    let book_id = create_book(&app, &admin, 10).await;

    let customer = login_as(&app, &state, "payer@example.com", "Customer").await;
    send(
        &app,
        Method::POST,
        "/api/cart/items",
        Some(&customer),
        Some(serde_json::json!({ "book_id": book_id, "quantity": 3 })),
    )
    .await;
    let (_, _, placed) = send(
        &app,
        Method::POST,
        "/api/cart/checkout",
        Some(&customer),
        Some(serde_json::json!({
            "shipping_address": "addr",
            "payment_method": "Bank Transfer",
            "shipping_method_id": 1,
        })),
    )
    .await;
    assert_eq!(placed["next"], serde_json::json!("payment"));
    let order_id = placed["order_id"].as_i64().unwrap();

    // Gateway webhook (unauthenticated)
    let payload = serde_json::json!({
        "amount": 1_000_000.0,
        "order_invoice_number": order_id.to_string(),
        "transaction_id": "TX-1",
        "content": "",
        "id": 1,
    });
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/payments/webhook",
        None,
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], serde_json::json!(true));

    // Replay is a no-op
    let (_, _, replay) = send(&app, Method::POST, "/api/payments/webhook", None, Some(payload)).await;
    assert_eq!(replay["success"], serde_json::json!(false));

    let (_, _, status_body) = send(
        &app,
        Method::GET,
        &format!("/api/payments/{order_id}/status"),
        None,
        None,
    )
    .await;
    assert_eq!(status_body["is_paid"], serde_json::json!(true));

    // Admin walks the order to Completed twice; stock moves once
    for (status_name, expect_deduct) in [
        ("Confirmed", false),
        ("Completed", true),
        ("Completed", false),
    ] {
        let (status, _, body) = send(
            &app,
            Method::POST,
            &format!("/api/admin/orders/{order_id}/status"),
            Some(&admin),
            Some(serde_json::json!({ "status": status_name })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["stock_deducted"],
            serde_json::json!(expect_deduct),
            "transition to {status_name}"
        );
    }

    let (_, _, book) = send(
        &app,
        Method::GET,
        &format!("/api/books/{book_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(book["stock_quantity"], serde_json::json!(7));
    assert_eq!(book["sold_quantity"], serde_json::json!(3));
}

#[tokio::test]
async fn abandoned_bank_transfer_order_is_cleaned_on_cart_return() {
    let (app, state) = test_app().await;
    let admin = login_as(&app, &state, "admin@example.com", "Admin").await;
    let book_id = create_book(&app, &admin, 5).await;

    let customer = login_as(&app, &state, "ghost@example.com", "Customer").await;
    send(
        &app,
        Method::POST,
        "/api/cart/items",
        Some(&customer),
        Some(serde_json::json!({ "book_id": book_id, "quantity": 1 })),
    )
    .await;
    let (_, _, placed) = send(
        &app,
        Method::POST,
        "/api/cart/checkout",
        Some(&customer),
        Some(serde_json::json!({
            "shipping_address": "addr",
            "payment_method": "Bank Transfer",
            "shipping_method_id": 1,
        })),
    )
    .await;
    let order_id = placed["order_id"].as_i64().unwrap();

    // Never pays, wanders back to the cart: order evaporates
    let (status, _, _) = send(&app, Method::GET, "/api/cart", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(
        &app,
        Method::GET,
        &format!("/api/orders/{order_id}"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_placement_writes_notification() {
    let (app, state) = test_app().await;
    let admin = login_as(&app, &state, "admin@example.com", "Admin").await;
    let book_id = create_book(&app, &admin, 5).await;

    let customer = login_as(&app, &state, "notify@example.com", "Customer").await;
    send(
        &app,
        Method::POST,
        "/api/cart/items",
        Some(&customer),
        Some(serde_json::json!({ "book_id": book_id, "quantity": 1 })),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/api/cart/checkout",
        Some(&customer),
        Some(serde_json::json!({
            "shipping_address": "addr",
            "payment_method": "COD",
            "shipping_method_id": 1,
        })),
    )
    .await;

    let (_, _, count) = send(
        &app,
        Method::GET,
        "/api/account/notifications/unread-count",
        Some(&customer),
        None,
    )
    .await;
    assert!(count.as_i64().unwrap() >= 1);
}

#[tokio::test]
async fn admin_chat_rest_marks_messages_read() {
    let (app, state) = test_app().await;
    let admin = login_as(&app, &state, "admin@example.com", "Admin").await;
    let _customer = login_as(&app, &state, "chatter@example.com", "Customer").await;

    let u = bookstore_server::db::repository::user::find_by_email(&state.pool, "chatter@example.com")
        .await
        .unwrap()
        .unwrap();
    let room = chat::get_or_create_room(&state.pool, u.id).await.unwrap();
    chat::append_message(&state.pool, room.id, "User", u.id, "hello", MessageKind::Text, false)
        .await
        .unwrap();

    let (status, _, rooms) = send(&app, Method::GET, "/api/admin/chat/rooms", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rooms[0]["unread_count"], serde_json::json!(1));

    let (status, _, messages) = send(
        &app,
        Method::GET,
        &format!("/api/admin/chat/rooms/{}/messages", room.id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages["messages"].as_array().unwrap().len(), 1);

    let (_, _, rooms) = send(&app, Method::GET, "/api/admin/chat/rooms", Some(&admin), None).await;
    assert_eq!(rooms[0]["unread_count"], serde_json::json!(0));

}
