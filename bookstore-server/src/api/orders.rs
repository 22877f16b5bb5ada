//! Customer order history

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use shared::models::{Order, OrderDetailRow, OrderStatus, Payment, Shipping};
use shared::response::Page;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{order, payment};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// "all" or an order status name
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
    10
}

pub async fn history(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(q): Query<HistoryQuery>,
) -> AppResult<Json<Page<Order>>> {
    let status = match q.status.as_str() {
        "" | "all" => None,
        other => Some(
            OrderStatus::from_str(other).map_err(AppError::validation)?,
        ),
    };

    let (items, total) =
        order::history_for_user(&state.pool, user.id, status, q.page, q.page_size).await?;
    Ok(Json(Page::new(items, total, q.page, q.page_size)))
}

#[derive(Debug, Serialize)]
pub struct OrderDetailsResponse {
    pub order: Order,
    pub details: Vec<OrderDetailRow>,
    pub payment: Option<Payment>,
    pub shipping: Option<Shipping>,
}

pub async fn details(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetailsResponse>> {
    let o = order::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
    if o.user_id != user.id {
        return Err(AppError::forbidden("Not your order"));
    }

    Ok(Json(OrderDetailsResponse {
        details: order::details_of(&state.pool, id).await?,
        payment: payment::find_by_order(&state.pool, id).await?,
        shipping: order::shipping_of(&state.pool, id).await?,
        order: o,
    }))
}
