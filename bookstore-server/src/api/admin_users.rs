//! Admin user management

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use shared::models::{Role, UserResponse};
use shared::response::Page;

use super::admin_books::SearchPageQuery;
use crate::core::ServerState;
use crate::db::repository::{role, user};
use crate::utils::{AppError, AppResult};

pub async fn list(
    State(state): State<ServerState>,
    Query(q): Query<SearchPageQuery>,
) -> AppResult<Json<Page<UserResponse>>> {
    let (items, total) = user::list(&state.pool, &q.search, q.page, q.page_size).await?;
    Ok(Json(Page::new(items, total, q.page, q.page_size)))
}

#[derive(Debug, Serialize)]
pub struct ToggleStatusResponse {
    pub is_active: bool,
}

pub async fn toggle_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ToggleStatusResponse>> {
    let is_active = user::toggle_status(&state.pool, id).await?;
    Ok(Json(ToggleStatusResponse { is_active }))
}

#[derive(Debug, Serialize)]
pub struct UserRolesResponse {
    pub user: UserResponse,
    pub roles: Vec<Role>,
    pub all_roles: Vec<Role>,
}

pub async fn get_roles(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserRolesResponse>> {
    let u = user::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
    Ok(Json(UserRolesResponse {
        user: u.into(),
        roles: user::roles_of(&state.pool, id).await?,
        all_roles: role::find_all(&state.pool).await?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRolesRequest {
    pub role_ids: Vec<i64>,
}

pub async fn update_roles(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRolesRequest>,
) -> AppResult<Json<Vec<Role>>> {
    if user::find_by_id(&state.pool, id).await?.is_none() {
        return Err(AppError::not_found(format!("User {id} not found")));
    }
    user::set_roles(&state.pool, id, &req.role_ids).await?;
    Ok(Json(user::roles_of(&state.pool, id).await?))
}
