//! Admin author management

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use shared::models::{Author, AuthorCreate, AuthorUpdate};

use crate::core::ServerState;
use crate::db::repository::author;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

pub async fn list(
    State(state): State<ServerState>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<Author>>> {
    Ok(Json(author::find_all(&state.pool, &q.search).await?))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(data): Json<AuthorCreate>,
) -> AppResult<Json<Author>> {
    Ok(Json(author::create(&state.pool, data).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(data): Json<AuthorUpdate>,
) -> AppResult<Json<Author>> {
    Ok(Json(author::update(&state.pool, id, data).await?))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(author::delete(&state.pool, id).await?))
}
