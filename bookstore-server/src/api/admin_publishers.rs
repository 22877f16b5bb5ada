//! Admin publisher management

use axum::extract::{Path, Query, State};
use axum::Json;

use shared::models::{Publisher, PublisherCreate, PublisherUpdate};

use super::admin_authors::SearchQuery;
use crate::core::ServerState;
use crate::db::repository::publisher;
use crate::utils::AppResult;

pub async fn list(
    State(state): State<ServerState>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<Publisher>>> {
    Ok(Json(publisher::find_all(&state.pool, &q.search).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(data): Json<PublisherCreate>,
) -> AppResult<Json<Publisher>> {
    Ok(Json(publisher::create(&state.pool, data).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(data): Json<PublisherUpdate>,
) -> AppResult<Json<Publisher>> {
    Ok(Json(publisher::update(&state.pool, id, data).await?))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(publisher::delete(&state.pool, id).await?))
}
