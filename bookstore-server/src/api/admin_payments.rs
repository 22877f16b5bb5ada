//! Admin payment management

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::str::FromStr;

use shared::models::{Payment, PaymentSetting, PaymentSettingUpdate, PaymentStatus};
use shared::response::Page;

use crate::core::ServerState;
use crate::db::repository::payment;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
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
    Query(q): Query<PaymentListQuery>,
) -> AppResult<Json<Page<Payment>>> {
    let status = match q.status.as_str() {
        "" | "all" => None,
        other => Some(PaymentStatus::from_str(other).map_err(AppError::validation)?),
    };
    let (items, total) = payment::list(&state.pool, status, q.page, q.page_size).await?;
    Ok(Json(Page::new(items, total, q.page, q.page_size)))
}

pub async fn settings(State(state): State<ServerState>) -> AppResult<Json<Vec<PaymentSetting>>> {
    Ok(Json(payment::settings(&state.pool).await?))
}

pub async fn update_setting(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(data): Json<PaymentSettingUpdate>,
) -> AppResult<Json<PaymentSetting>> {
    Ok(Json(payment::update_setting(&state.pool, id, data).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub status: String,
}

pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePaymentStatusRequest>,
) -> AppResult<Json<Payment>> {
    let status = PaymentStatus::from_str(&req.status).map_err(AppError::validation)?;
    Ok(Json(payment::update_status(&state.pool, id, status).await?))
}
