//! Admin category management

use axum::extract::{Path, State};
use axum::Json;

use shared::models::{Category, CategoryCreate, CategoryUpdate};

use crate::core::ServerState;
use crate::db::repository::category;
use crate::utils::AppResult;

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(category::find_all(&state.pool).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(data): Json<CategoryCreate>,
) -> AppResult<Json<Category>> {
    Ok(Json(category::create(&state.pool, data).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(data): Json<CategoryUpdate>,
) -> AppResult<Json<Category>> {
    Ok(Json(category::update(&state.pool, id, data).await?))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(category::delete(&state.pool, id).await?))
}
