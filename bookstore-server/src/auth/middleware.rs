//! 会话与鉴权中间件
//!
//! - [`session_layer`] 保证每个 `/api` 请求都有会话，并注入
//!   [`SessionHandle`] / [`CurrentUser`]
//! - [`require_login`] 登录检查（401）
//! - [`require_permission`] 权限门：`Super Admin` / `Admin` 直接放行，
//!   其余按 `Module.Action` 精确或 `Module.*` 通配匹配，拒绝返回 403

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::session::{CurrentUser, SessionHandle};
use crate::core::ServerState;
use crate::utils::AppError;

/// Response header carrying a newly created session token
pub const SESSION_HEADER: &str = "x-session-token";

/// Extract the session token from `Authorization: Bearer` or, for
/// WebSocket upgrades that cannot set headers, the `token` query param.
fn extract_token(req: &Request) -> Option<String> {
    if let Some(header) = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    req.uri().query().and_then(|q| {
        q.split('&')
            .find_map(|pair| pair.strip_prefix("token="))
            .map(|t| t.to_string())
    })
}

/// 会话中间件 - 首次访问时创建空会话
///
/// 新建会话的 token 通过 `x-session-token` 响应头返回给浏览器。
pub async fn session_layer(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 非 API 路由跳过（让它们正常返回 404）
    if !req.uri().path().starts_with("/api/") {
        return Ok(next.run(req).await);
    }

    let sessions = state.sessions.clone();
    let (token, created) = match extract_token(&req) {
        Some(t) if sessions.contains(&t) => (t, false),
        // Unknown or missing token: start a fresh session
        _ => (sessions.create(), true),
    };

    let handle = SessionHandle::new(sessions.clone(), token.clone());
    if let Some(Some(user)) = handle.read(|s| s.current_user()) {
        req.extensions_mut().insert(user);
    }
    req.extensions_mut().insert(handle);

    let mut response = next.run(req).await;
    if created {
        if let Ok(value) = token.parse() {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }
    Ok(response)
}

/// 登录检查中间件
pub async fn require_login(req: Request, next: Next) -> Result<Response, AppError> {
    if req.extensions().get::<CurrentUser>().is_none() {
        return Err(AppError::unauthorized());
    }
    Ok(next.run(req).await)
}

/// 权限检查中间件 - 要求指定模块/操作权限
///
/// # 用法
///
/// ```ignore
/// Router::new()
///     .route("/api/admin/roles", get(handler::list))
///     .layer(middleware::from_fn(require_permission("Role", "View")));
/// ```
pub fn require_permission(
    module: &'static str,
    action: &'static str,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AppError>> + Send>>
       + Clone {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let user = req
                .extensions()
                .get::<CurrentUser>()
                .ok_or(AppError::unauthorized())?;

            if !user.has_permission(module, action) {
                tracing::warn!(
                    user_id = user.id,
                    role = %user.role_name,
                    module,
                    action,
                    "permission denied"
                );
                return Err(AppError::forbidden(format!(
                    "Permission denied: {module}.{action}"
                )));
            }

            Ok(next.run(req).await)
        })
    }
}

/// 管理员中间件 - 仅 `Super Admin` / `Admin` 角色可过
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(AppError::unauthorized())?;
    if !user.is_privileged() {
        tracing::warn!(user_id = user.id, role = %user.role_name, "admin required");
        return Err(AppError::forbidden("Administrator role required"));
    }
    Ok(next.run(req).await)
}
