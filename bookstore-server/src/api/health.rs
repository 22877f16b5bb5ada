//! Health Check

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
    pub chat_groups: usize,
}

pub async fn health(State(state): State<ServerState>) -> AppResult<Json<HealthResponse>> {
    // A trivial query doubles as a database liveness probe
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(crate::utils::AppError::from)?;

    Ok(Json(HealthResponse {
        status: "ok",
        sessions: state.sessions.len(),
        chat_groups: state.chat.room_group_count(),
    }))
}
