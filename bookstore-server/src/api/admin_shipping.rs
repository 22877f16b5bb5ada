//! Admin shipping method management

use axum::extract::{Path, State};
use axum::Json;

use shared::models::{ShippingMethod, ShippingMethodCreate, ShippingMethodUpdate};

use crate::core::ServerState;
use crate::db::repository::shipping_method;
use crate::utils::AppResult;

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<ShippingMethod>>> {
    Ok(Json(shipping_method::find_all(&state.pool).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(data): Json<ShippingMethodCreate>,
) -> AppResult<Json<ShippingMethod>> {
    Ok(Json(shipping_method::create(&state.pool, data).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(data): Json<ShippingMethodUpdate>,
) -> AppResult<Json<ShippingMethod>> {
    Ok(Json(shipping_method::update(&state.pool, id, data).await?))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(shipping_method::delete(&state.pool, id).await?))
}
