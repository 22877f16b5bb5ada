//! Admin inventory management

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use shared::models::{BookListItem, InventoryLogRow};
use shared::response::Page;

use super::admin_books::SearchPageQuery;
use crate::core::ServerState;
use crate::db::repository::inventory;
use crate::utils::AppResult;

/// 缺货优先的库存列表
pub async fn list(
    State(state): State<ServerState>,
    Query(q): Query<SearchPageQuery>,
) -> AppResult<Json<Page<BookListItem>>> {
    let (items, total) = inventory::stock_page(&state.pool, &q.search, q.page, q.page_size).await?;
    Ok(Json(Page::new(items, total, q.page, q.page_size)))
}

pub async fn logs(
    State(state): State<ServerState>,
    Path(book_id): Path<i64>,
) -> AppResult<Json<Vec<InventoryLogRow>>> {
    Ok(Json(inventory::logs_for_book(&state.pool, book_id, 50).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub quantity: i64,
    pub reason: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct UpdateStockResponse {
    pub change_quantity: i64,
}

pub async fn update_stock(
    State(state): State<ServerState>,
    Path(book_id): Path<i64>,
    Json(req): Json<UpdateStockRequest>,
) -> AppResult<Json<UpdateStockResponse>> {
    let delta =
        inventory::set_stock(&state.pool, book_id, req.quantity, req.reason.as_deref()).await?;
    Ok(Json(UpdateStockResponse {
        change_quantity: delta,
    }))
}
