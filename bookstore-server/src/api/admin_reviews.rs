//! Admin review moderation

use axum::extract::{Path, Query, State};
use axum::Json;

use shared::models::ReviewRow;
use shared::response::Page;

use super::account::PageQuery;
use crate::core::ServerState;
use crate::db::repository::review;
use crate::utils::AppResult;

pub async fn list(
    State(state): State<ServerState>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Page<ReviewRow>>> {
    let (items, total) = review::list(&state.pool, q.page, q.page_size).await?;
    Ok(Json(Page::new(items, total, q.page, q.page_size)))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(review::delete(&state.pool, id).await?))
}
