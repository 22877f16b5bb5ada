//! Admin role management (RBAC)

use axum::extract::{Path, State};
use axum::Json;

use shared::models::{Role, RoleCreate, RoleUpdate};

use crate::auth::permissions::all_permissions;
use crate::core::ServerState;
use crate::db::repository::role;
use crate::utils::AppResult;

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Role>>> {
    Ok(Json(role::find_all(&state.pool).await?))
}

/// 角色表单的权限矩阵（模块 × 操作）
pub async fn permission_catalog() -> Json<Vec<(String, Vec<String>)>> {
    Json(all_permissions())
}

pub async fn create(
    State(state): State<ServerState>,
    Json(data): Json<RoleCreate>,
) -> AppResult<Json<Role>> {
    Ok(Json(role::create(&state.pool, data).await?))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(data): Json<RoleUpdate>,
) -> AppResult<Json<Role>> {
    Ok(Json(role::update(&state.pool, id, data).await?))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(role::delete(&state.pool, id).await?))
}
