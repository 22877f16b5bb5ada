//! Cart & Checkout API
//!
//! 购物车完全存在会话里；下单把它转成订单聚合（同一事务），
//! 成功页清空购物车。银行转账单在回到购物车时清理未支付的挂单。

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use shared::models::{
    Order, OrderDetailRow, Payment, PaymentSetting, PlaceOrderRequest, Promotion, ShippingMethod,
    UserAddress, WebhookPayload,
};

use crate::auth::session::ShippingDraft;
use crate::auth::{CurrentUser, SessionHandle};
use crate::cart::Cart;
use crate::core::ServerState;
use crate::db::repository::{book, notification, order, payment, promotion, shipping_method, user};
use crate::utils::{AppError, AppResult};

const BANK_TRANSFER: &str = "Bank Transfer";

fn cart_of(session: &SessionHandle) -> AppResult<Cart> {
    session
        .read(|s| s.cart.clone())
        .ok_or_else(|| AppError::internal("Session vanished"))
}

// ========== Cart view ==========

#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub total_quantity: i64,
    pub subtotal: f64,
    pub final_total: f64,
    pub promotions: Vec<Promotion>,
    pub standard_shipping_fee: f64,
}

pub async fn get_cart(
    State(state): State<ServerState>,
    Extension(session): Extension<SessionHandle>,
) -> AppResult<Json<CartView>> {
    // 清理被放弃的银行转账挂单（已支付的跳过）
    if let Some(Some(pending_id)) = session.read(|s| s.pending_order_id) {
        match order::delete_if_unpaid(&state.pool, pending_id).await {
            Ok(removed) => {
                if removed {
                    tracing::info!(order_id = pending_id, "abandoned pending order removed");
                }
                session.write(|s| s.pending_order_id = None);
            }
            Err(e) => tracing::warn!(order_id = pending_id, "pending-order cleanup failed: {e}"),
        }
    }

    let cart = cart_of(&session)?;
    let promotions = promotion::list_active(&state.pool).await?;
    let standard_fee = shipping_method::standard(&state.pool)
        .await?
        .map(|m| m.price)
        .unwrap_or(0.0);

    Ok(Json(CartView {
        total_quantity: cart.total_quantity(),
        subtotal: cart.subtotal(),
        final_total: cart.final_total(),
        cart,
        promotions,
        standard_shipping_fee: standard_fee,
    }))
}

// ========== Item operations ==========

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub book_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct CartCountResponse {
    pub cart_count: i64,
}

pub async fn add_item(
    State(state): State<ServerState>,
    Extension(session): Extension<SessionHandle>,
    Json(req): Json<AddItemRequest>,
) -> AppResult<Json<CartCountResponse>> {
    if req.quantity <= 0 {
        return Err(AppError::validation("Quantity must be positive"));
    }
    let b = book::find_active_by_id(&state.pool, req.book_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Book {} not found", req.book_id)))?;
    let image = book::images_of(&state.pool, b.id)
        .await?
        .into_iter()
        .find(|i| i.is_main)
        .map(|i| i.image_url);

    let count = session
        .write(|s| {
            s.cart.add_book(&b, image, req.quantity);
            s.cart.total_quantity()
        })
        .ok_or_else(|| AppError::internal("Session vanished"))?;

    Ok(Json(CartCountResponse { cart_count: count }))
}

/// Buy-now: add one and let the client jump straight to the cart
pub async fn buy_now(
    State(state): State<ServerState>,
    Extension(session): Extension<SessionHandle>,
    Path(book_id): Path<i64>,
) -> AppResult<Json<CartCountResponse>> {
    add_item(
        State(state),
        Extension(session),
        Json(AddItemRequest {
            book_id,
            quantity: 1,
        }),
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

pub async fn update_item(
    Extension(session): Extension<SessionHandle>,
    Path(book_id): Path<i64>,
    Json(req): Json<UpdateQuantityRequest>,
) -> AppResult<Json<CartCountResponse>> {
    let count = session
        .write(|s| {
            s.cart.update_quantity(book_id, req.quantity);
            s.cart.total_quantity()
        })
        .ok_or_else(|| AppError::internal("Session vanished"))?;
    Ok(Json(CartCountResponse { cart_count: count }))
}

pub async fn remove_item(
    Extension(session): Extension<SessionHandle>,
    Path(book_id): Path<i64>,
) -> AppResult<Json<CartCountResponse>> {
    let count = session
        .write(|s| {
            s.cart.remove(book_id);
            s.cart.total_quantity()
        })
        .ok_or_else(|| AppError::internal("Session vanished"))?;
    Ok(Json(CartCountResponse { cart_count: count }))
}

// ========== Coupons ==========

#[derive(Debug, Deserialize)]
pub struct CouponRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct CouponResponse {
    pub discount: f64,
    pub final_total: f64,
}

/// 活动名即优惠码；Percent 按小计折算，Amount 直接抵扣
pub async fn apply_coupon(
    State(state): State<ServerState>,
    Extension(session): Extension<SessionHandle>,
    Json(req): Json<CouponRequest>,
) -> AppResult<Json<CouponResponse>> {
    let promo = promotion::find_active_by_name(&state.pool, &req.code)
        .await?
        .ok_or_else(|| AppError::validation("Coupon is invalid or expired"))?;

    let result = session
        .write(|s| {
            let discount = promo.discount_for(s.cart.subtotal());
            s.cart.apply_coupon(&promo.name, discount);
            CouponResponse {
                discount,
                final_total: s.cart.final_total(),
            }
        })
        .ok_or_else(|| AppError::internal("Session vanished"))?;
    Ok(Json(result))
}

pub async fn remove_coupon(
    Extension(session): Extension<SessionHandle>,
) -> AppResult<Json<CouponResponse>> {
    let result = session
        .write(|s| {
            s.cart.remove_coupon();
            CouponResponse {
                discount: 0.0,
                final_total: s.cart.final_total(),
            }
        })
        .ok_or_else(|| AppError::internal("Session vanished"))?;
    Ok(Json(result))
}

// ========== Shipping address draft ==========

pub async fn set_shipping_address(
    Extension(session): Extension<SessionHandle>,
    Json(draft): Json<ShippingDraft>,
) -> AppResult<Json<shared::AppResponse<()>>> {
    session
        .write(|s| s.shipping = Some(draft))
        .ok_or_else(|| AppError::internal("Session vanished"))?;
    Ok(Json(shared::AppResponse::success(())))
}

// ========== Checkout ==========

#[derive(Debug, Serialize)]
pub struct CheckoutInfo {
    pub cart: Cart,
    pub final_total: f64,
    pub addresses: Vec<UserAddress>,
    pub shipping_draft: Option<ShippingDraft>,
    pub promotions: Vec<Promotion>,
    pub shipping_methods: Vec<ShippingMethod>,
    pub payment_settings: Vec<PaymentSetting>,
}

pub async fn checkout_info(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Extension(session): Extension<SessionHandle>,
) -> AppResult<Json<CheckoutInfo>> {
    let cart = cart_of(&session)?;
    if cart.is_empty() {
        return Err(AppError::validation("Cart is empty"));
    }

    Ok(Json(CheckoutInfo {
        final_total: cart.final_total(),
        cart,
        addresses: user::addresses_of(&state.pool, user.id).await?,
        shipping_draft: session.read(|s| s.shipping.clone()).flatten(),
        promotions: promotion::list_active(&state.pool).await?,
        shipping_methods: shipping_method::find_all(&state.pool).await?,
        payment_settings: payment::enabled_settings(&state.pool).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub order_id: i64,
    /// "payment" for bank transfer, otherwise "success"
    pub next: &'static str,
}

pub async fn place_order(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Extension(session): Extension<SessionHandle>,
    Json(req): Json<PlaceOrderRequest>,
) -> AppResult<Json<PlaceOrderResponse>> {
    let cart = cart_of(&session)?;
    if cart.is_empty() {
        return Err(AppError::validation("Cart is empty"));
    }

    // 选中的收货地址优先于自由文本
    let shipping_address = match req.address_id {
        Some(address_id) if address_id > 0 => user::find_address(&state.pool, user.id, address_id)
            .await?
            .map(|a| a.full_address())
            .ok_or_else(|| AppError::not_found("Address not found"))?,
        _ => req
            .shipping_address
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::validation("Shipping address is required"))?,
    };

    let method = shipping_method::find_by_id(&state.pool, req.shipping_method_id).await?;
    let (method_name, fee) = method
        .map(|m| (m.name, m.price))
        .unwrap_or_else(|| ("Standard".to_string(), 0.0));

    let order_id = order::place_order(
        &state.pool,
        user.id,
        &cart,
        &shipping_address,
        &req.payment_method,
        &method_name,
        fee,
    )
    .await?;
    tracing::info!(order_id, user_id = user.id, "order placed");

    let is_bank_transfer = req.payment_method == BANK_TRANSFER;
    if is_bank_transfer {
        // 挂单标记：付款前回到购物车会触发清理
        session.write(|s| s.pending_order_id = Some(order_id));
        Ok(Json(PlaceOrderResponse {
            order_id,
            next: "payment",
        }))
    } else {
        state
            .notify_user(
                user.id,
                "Order placed",
                &format!("Your order #{order_id} has been placed successfully."),
                "Order",
                Some(&format!("/orders/{order_id}")),
            )
            .await;
        Ok(Json(PlaceOrderResponse {
            order_id,
            next: "success",
        }))
    }
}

// ========== Payment ==========

#[derive(Debug, Serialize)]
pub struct PaymentPage {
    pub order: Order,
    pub details: Vec<OrderDetailRow>,
    pub bank: Option<PaymentSetting>,
}

pub async fn payment_page(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(order_id): Path<i64>,
) -> AppResult<Json<PaymentPage>> {
    let o = order::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    if o.user_id != user.id {
        return Err(AppError::forbidden("Not your order"));
    }

    Ok(Json(PaymentPage {
        details: order::details_of(&state.pool, order_id).await?,
        bank: payment::bank_transfer_setting(&state.pool).await?,
        order: o,
    }))
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub is_paid: bool,
    pub status: String,
}

pub async fn payment_status(
    State(state): State<ServerState>,
    Path(order_id): Path<i64>,
) -> AppResult<Json<PaymentStatusResponse>> {
    let p = payment::find_by_order(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment not found"))?;
    Ok(Json(PaymentStatusResponse {
        is_paid: p.status == shared::models::PaymentStatus::Paid,
        status: p.status.to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Payment-gateway webhook: match order by invoice number + amount,
/// mark paid. Idempotent — replays report `success: false`.
pub async fn payment_webhook(
    State(state): State<ServerState>,
    Json(payload): Json<WebhookPayload>,
) -> AppResult<Json<WebhookResponse>> {
    let order_id: i64 = match payload.order_invoice_number.trim().parse() {
        Ok(id) => id,
        Err(_) => {
            return Ok(Json(WebhookResponse {
                success: false,
                order_id: None,
                message: Some("Invalid invoice number".to_string()),
            }))
        }
    };

    let p = payment::find_by_order(&state.pool, order_id).await?;
    let matches = p
        .as_ref()
        .map(|p| p.amount <= payload.amount)
        .unwrap_or(false);
    if !matches {
        return Ok(Json(WebhookResponse {
            success: false,
            order_id: None,
            message: Some("Order not found or amount mismatch".to_string()),
        }));
    }

    let tx_code = (!payload.transaction_id.is_empty()).then_some(payload.transaction_id.as_str());
    let updated = payment::mark_paid(&state.pool, order_id, tx_code).await?;
    if updated {
        tracing::info!(order_id, "payment confirmed via webhook");
        Ok(Json(WebhookResponse {
            success: true,
            order_id: Some(order_id),
            message: None,
        }))
    } else {
        Ok(Json(WebhookResponse {
            success: false,
            order_id: Some(order_id),
            message: Some("Already processed".to_string()),
        }))
    }
}

/// Development helper mirroring the gateway's happy path
pub async fn simulate_payment(
    State(state): State<ServerState>,
    Path(order_id): Path<i64>,
) -> AppResult<Json<shared::AppResponse<()>>> {
    if payment::find_by_order(&state.pool, order_id).await?.is_none() {
        return Err(AppError::not_found("Payment not found"));
    }
    payment::mark_paid(&state.pool, order_id, None).await?;
    Ok(Json(shared::AppResponse::success(())))
}

// ========== Order success ==========

#[derive(Debug, Serialize)]
pub struct OrderSuccessResponse {
    pub order: Order,
    pub details: Vec<OrderDetailRow>,
    pub payment: Option<Payment>,
}

/// First visit writes the success notification (dedup by order id),
/// then the cart and the pending flag are dropped.
pub async fn order_success(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Extension(session): Extension<SessionHandle>,
    Path(order_id): Path<i64>,
) -> AppResult<Json<OrderSuccessResponse>> {
    let o = order::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    if o.user_id != user.id {
        return Err(AppError::forbidden("Not your order"));
    }

    let title = "Order confirmed";
    let already = notification::exists_with_message(&state.pool, title, &format!("%#{order_id}%"))
        .await
        .unwrap_or(false);
    if !already {
        state
            .notify_user(
                user.id,
                title,
                &format!("Your order #{order_id} has been placed successfully!"),
                "Success",
                Some(&format!("/orders/{order_id}")),
            )
            .await;
    }

    // 成功页 = 购物车生命周期终点
    session.write(|s| {
        s.cart = Cart::default();
        s.pending_order_id = None;
    });

    Ok(Json(OrderSuccessResponse {
        details: order::details_of(&state.pool, order_id).await?,
        payment: payment::find_by_order(&state.pool, order_id).await?,
        order: o,
    }))
}
