//! Admin reports & dashboard

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use shared::models::{BookListItem, OrderWithUser};

use crate::core::ServerState;
use crate::db::repository::report::{self, DashboardStats, SalesSummary};
use crate::db::repository::order;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// "day" | "week" | "month" | "year"
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_period() -> String {
    "month".to_string()
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub summary: SalesSummary,
    pub top_sellers: Vec<BookListItem>,
    pub low_stock: Vec<BookListItem>,
}

pub async fn sales(
    State(state): State<ServerState>,
    Query(q): Query<ReportQuery>,
) -> AppResult<Json<ReportResponse>> {
    Ok(Json(ReportResponse {
        summary: report::sales_summary(&state.pool, &q.period).await?,
        top_sellers: report::top_sellers(&state.pool, 10).await?,
        low_stock: report::low_stock(&state.pool, 5, 10).await?,
    }))
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub recent_orders: Vec<OrderWithUser>,
}

pub async fn dashboard(State(state): State<ServerState>) -> AppResult<Json<DashboardResponse>> {
    Ok(Json(DashboardResponse {
        stats: report::dashboard(&state.pool).await?,
        recent_orders: order::recent(&state.pool, 10).await?,
    }))
}
