//! Admin order management
//!
//! 状态机：Pending → Confirmed → Shipping → Completed / Cancelled。
//! 转入 Completed 时扣库存（仅一次）；转入 Confirmed 时发确认邮件。

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use shared::models::{
    Order, OrderDetailRow, OrderStatus, OrderWithUser, Payment, Shipping,
};
use shared::response::Page;

use crate::core::ServerState;
use crate::db::repository::{order, payment, user};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub status: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

pub async fn list(
    State(state): State<ServerState>,
    Query(q): Query<OrderListQuery>,
) -> AppResult<Json<Page<OrderWithUser>>> {
    let status = match q.status.as_str() {
        "" | "all" => None,
        other => Some(OrderStatus::from_str(other).map_err(AppError::validation)?),
    };
    let (items, total) = order::list(&state.pool, status, q.page, q.page_size).await?;
    Ok(Json(Page::new(items, total, q.page, q.page_size)))
}

#[derive(Debug, Serialize)]
pub struct AdminOrderDetails {
    pub order: OrderWithUser,
    pub details: Vec<OrderDetailRow>,
    pub payment: Option<Payment>,
    pub shipping: Option<Shipping>,
}

pub async fn details(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AdminOrderDetails>> {
    let o = order::find_with_user(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
    Ok(Json(AdminOrderDetails {
        details: order::details_of(&state.pool, id).await?,
        payment: payment::find_by_order(&state.pool, id).await?,
        shipping: order::shipping_of(&state.pool, id).await?,
        order: o,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub order: Order,
    pub stock_deducted: bool,
}

pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<UpdateStatusResponse>> {
    let new_status = OrderStatus::from_str(&req.status).map_err(AppError::validation)?;

    let (old_status, stock_deducted) = order::update_status(&state.pool, id, new_status).await?;
    let o = order::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;

    // 确认邮件：仅在首次转入 Confirmed 时发送；失败吞掉
    if new_status == OrderStatus::Confirmed && old_status != OrderStatus::Confirmed {
        if let Ok(Some(u)) = user::find_by_id(&state.pool, o.user_id).await {
            let email = state.email.clone();
            let total = o.total_amount;
            tokio::spawn(async move {
                email
                    .send_order_confirmation(&u.email, &u.full_name, id, total)
                    .await;
            });
        }
    }

    let message = match new_status {
        OrderStatus::Confirmed => format!("Your order #{id} has been confirmed."),
        OrderStatus::Shipping => format!("Your order #{id} is on its way."),
        OrderStatus::Completed => format!("Your order #{id} has been delivered. Thank you!"),
        OrderStatus::Cancelled => format!("Your order #{id} has been cancelled."),
        OrderStatus::Pending => format!("Your order #{id} is pending again."),
    };
    state
        .notify_user(o.user_id, "Order status updated", &message, "Order", Some("/orders"))
        .await;

    tracing::info!(
        order_id = id,
        from = %old_status,
        to = %new_status,
        stock_deducted,
        "order status updated"
    );

    Ok(Json(UpdateStatusResponse {
        order: o,
        stock_deducted,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateShippingRequest {
    pub shipping_company: String,
    pub tracking_number: String,
}

pub async fn update_shipping(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateShippingRequest>,
) -> AppResult<Json<Shipping>> {
    Ok(Json(
        order::update_shipping(&state.pool, id, &req.shipping_company, &req.tracking_number)
            .await?,
    ))
}
