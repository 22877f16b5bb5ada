//! Admin promotion management

use axum::extract::{Path, State};
use axum::Json;

use shared::models::{Promotion, PromotionCreate, PromotionUpdate};

use crate::core::ServerState;
use crate::db::repository::promotion;
use crate::utils::AppResult;

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Promotion>>> {
    Ok(Json(promotion::find_all(&state.pool).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(data): Json<PromotionCreate>,
) -> AppResult<Json<Promotion>> {
    Ok(Json(promotion::create(&state.pool, data).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(data): Json<PromotionUpdate>,
) -> AppResult<Json<Promotion>> {
    Ok(Json(promotion::update(&state.pool, id, data).await?))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(promotion::delete(&state.pool, id).await?))
}
