//! Account API — register/login/logout, profile, addresses, notifications
//!
//! 登录把身份与角色权限写进会话；匿名购物车在登录后保留。

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::models::{Notification, UserAddress, UserAddressSave, UserResponse};
use shared::response::Page;
use shared::util::now_millis;

use crate::auth::session::OtpState;
use crate::auth::{hash_password, verify_password, CurrentUser, SessionHandle};
use crate::core::ServerState;
use crate::db::repository::{notification, user};
use crate::utils::{AppError, AppResult};

/// OTP 有效期（毫秒）
const OTP_TTL_MS: i64 = 5 * 60 * 1000;

// ========== Auth ==========

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub role_name: String,
    pub permissions: Vec<String>,
    pub is_admin: bool,
}

pub async fn login(
    State(state): State<ServerState>,
    Extension(session): Extension<SessionHandle>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let found = user::find_by_email(&state.pool, &req.email).await?;

    // 统一错误信息，避免账号枚举
    let u = match found {
        Some(u) if u.is_active => u,
        _ => return Err(AppError::invalid_credentials()),
    };
    if !verify_password(&req.password, &u.password_hash) {
        tracing::warn!(email = %req.email, "login failed - invalid credentials");
        return Err(AppError::invalid_credentials());
    }

    let role = user::primary_role(&state.pool, u.id).await?;
    let (role_name, permissions) = match role {
        Some(r) => (r.name, r.permissions),
        None => ("Customer".to_string(), Vec::new()),
    };
    let permissions_json =
        serde_json::to_string(&permissions).unwrap_or_else(|_| "[]".to_string());

    session
        .write(|s| s.login(&u, &role_name, permissions_json))
        .ok_or_else(|| AppError::internal("Session vanished during login"))?;

    tracing::info!(user_id = u.id, role = %role_name, "user logged in");

    let is_admin = role_name == "Admin" || role_name == "Super Admin";
    Ok(Json(LoginResponse {
        user: u.into(),
        role_name,
        permissions,
        is_admin,
    }))
}

/// 登出丢弃整个会话（购物车一并清除）
pub async fn logout(Extension(session): Extension<SessionHandle>) -> Json<shared::AppResponse<()>> {
    session.destroy();
    Json(shared::AppResponse::success(()))
}

pub async fn me(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<LoginResponse>> {
    let u = user::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let is_admin = user.is_privileged();
    Ok(Json(LoginResponse {
        user: u.into(),
        role_name: user.role_name.clone(),
        permissions: user.permissions(),
        is_admin,
    }))
}

// ========== Registration (email OTP) ==========

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

pub async fn send_otp(
    State(state): State<ServerState>,
    Extension(session): Extension<SessionHandle>,
    Json(req): Json<SendOtpRequest>,
) -> AppResult<Json<shared::AppResponse<()>>> {
    if user::find_by_email(&state.pool, &req.email).await?.is_some() {
        return Err(AppError::conflict("Email is already registered"));
    }

    let code = crate::services::SmsService::generate_otp();
    session
        .write(|s| {
            s.email_otp = Some(OtpState {
                code: code.clone(),
                email: req.email.clone(),
                expires_at: now_millis() + OTP_TTL_MS,
            })
        })
        .ok_or_else(|| AppError::internal("Session vanished"))?;

    // 旁路投递：失败只记日志，接口总是成功返回
    let email = state.email.clone();
    let to = req.email.clone();
    tokio::spawn(async move { email.send_otp(&to, &code).await });

    Ok(Json(shared::AppResponse::success(())))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 6))]
    pub password: String,
    pub otp_code: String,
}

pub async fn register(
    State(state): State<ServerState>,
    Extension(session): Extension<SessionHandle>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<UserResponse>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    // OTP 校验：email 一致、未过期、码正确
    let otp = session
        .read(|s| s.email_otp.clone())
        .flatten()
        .ok_or_else(|| AppError::validation("Request a verification code first"))?;
    if otp.email != req.email || otp.expires_at < now_millis() {
        return Err(AppError::validation(
            "Verification code expired or does not match this email",
        ));
    }
    if otp.code != req.otp_code {
        return Err(AppError::validation("Incorrect verification code"));
    }

    let password_hash = hash_password(&req.password)?;
    let u = user::create(
        &state.pool,
        &req.full_name,
        &req.email,
        req.phone.as_deref(),
        &password_hash,
        true, // OTP passed = email verified
    )
    .await?;
    user::assign_role_by_name(&state.pool, u.id, "Customer").await?;

    session.write(|s| s.email_otp = None);
    tracing::info!(user_id = u.id, "user registered");

    Ok(Json(u.into()))
}

/// One-shot bootstrap: creates the first Super Admin account.
/// Refuses to run once any admin user exists.
#[derive(Debug, Deserialize)]
pub struct InitializeAdminRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

pub async fn initialize_admin(
    State(state): State<ServerState>,
    Json(req): Json<InitializeAdminRequest>,
) -> AppResult<Json<UserResponse>> {
    let admins: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_role ur JOIN role r ON r.id = ur.role_id WHERE r.name IN ('Super Admin', 'Admin')",
    )
    .fetch_one(&state.pool)
    .await
    .map_err(AppError::from)?;
    if admins > 0 {
        return Err(AppError::conflict("Admin account already initialized"));
    }

    let password_hash = hash_password(&req.password)?;
    let u = user::create(
        &state.pool,
        &req.full_name,
        &req.email,
        None,
        &password_hash,
        true,
    )
    .await?;
    user::assign_role_by_name(&state.pool, u.id, "Super Admin").await?;
    tracing::info!(user_id = u.id, "super admin initialized");

    Ok(Json(u.into()))
}

// ========== Profile ==========

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    /// Required when changing the password
    pub password: Option<String>,
    pub new_password: Option<String>,
}

pub async fn update_profile(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let new_hash = match &req.new_password {
        Some(new_password) => {
            let current = user::find_by_id(&state.pool, user.id)
                .await?
                .ok_or_else(|| AppError::not_found("User not found"))?;
            let old = req
                .password
                .as_deref()
                .ok_or_else(|| AppError::validation("Current password is required"))?;
            if !verify_password(old, &current.password_hash) {
                return Err(AppError::validation("Current password is incorrect"));
            }
            Some(hash_password(new_password)?)
        }
        None => None,
    };

    let updated = user::update_profile(
        &state.pool,
        user.id,
        req.full_name.as_deref(),
        req.phone.as_deref(),
        req.avatar_url.as_deref(),
        new_hash.as_deref(),
    )
    .await?;
    Ok(Json(updated.into()))
}

// ========== Addresses ==========

pub async fn list_addresses(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<UserAddress>>> {
    Ok(Json(user::addresses_of(&state.pool, user.id).await?))
}

pub async fn save_address(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(data): Json<UserAddressSave>,
) -> AppResult<Json<UserAddress>> {
    Ok(Json(user::save_address(&state.pool, user.id, data).await?))
}

pub async fn delete_address(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(user::delete_address(&state.pool, user.id, id).await?))
}

// ========== Notifications ==========

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

pub async fn list_notifications(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Page<Notification>>> {
    let (items, total) =
        notification::list_for_user(&state.pool, user.id, q.page, q.page_size).await?;
    Ok(Json(Page::new(items, total, q.page, q.page_size)))
}

/// 铃铛角标的未读数
pub async fn unread_count(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<i64>> {
    Ok(Json(notification::unread_count(&state.pool, user.id).await?))
}

/// Details view marks the notification read as a side effect
pub async fn notification_details(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<Notification>> {
    let n = notification::find_for_user(&state.pool, user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Notification not found"))?;
    notification::mark_read(&state.pool, user.id, id).await?;
    Ok(Json(n))
}

pub async fn mark_notification_read(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(notification::mark_read(&state.pool, user.id, id).await?))
}

pub async fn mark_all_notifications_read(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<i64>> {
    Ok(Json(notification::mark_all_read(&state.pool, user.id).await?))
}
