//! Server-side Sessions
//!
//! 会话是服务端状态，浏览器只持有一个不透明 token
//! （`Authorization: Bearer <token>`，WebSocket 走 `?token=` 查询参数）。
//! 首次访问时创建空会话；登录写入身份与角色权限；登出整体丢弃
//! （购物车随之消失）。空闲超时由后台任务清理。

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use shared::models::User;
use shared::util::now_millis;

use crate::auth::permissions::list_grants;
use crate::cart::Cart;

/// Email OTP issued during registration
#[derive(Debug, Clone)]
pub struct OtpState {
    pub code: String,
    pub email: String,
    pub expires_at: i64,
}

/// Shipping address draft picked on the cart page before checkout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingDraft {
    pub province_name: String,
    pub district_name: String,
    pub ward_name: String,
    pub house_number: String,
}

/// Per-browser session state
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub role_name: Option<String>,
    /// 角色权限的原始 JSON；解析推迟到鉴权时（坏数据 = 空集，fail closed）
    pub permissions_json: Option<String>,
    pub cart: Cart,
    /// Bank-transfer order awaiting payment (abandoned-order cleanup)
    pub pending_order_id: Option<i64>,
    pub shipping: Option<ShippingDraft>,
    pub email_otp: Option<OtpState>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some()
    }

    /// Populate identity fields at login. The cart survives login so an
    /// anonymous cart carries over to the authenticated session.
    pub fn login(&mut self, user: &User, role_name: &str, permissions_json: String) {
        self.user_id = Some(user.id);
        self.user_name = Some(user.full_name.clone());
        self.user_email = Some(user.email.clone());
        self.role_name = Some(role_name.to_string());
        self.permissions_json = Some(permissions_json);
    }

    /// Snapshot the identity for request extensions
    pub fn current_user(&self) -> Option<CurrentUser> {
        let id = self.user_id?;
        Some(CurrentUser {
            id,
            name: self.user_name.clone().unwrap_or_default(),
            email: self.user_email.clone().unwrap_or_default(),
            role_name: self.role_name.clone().unwrap_or_default(),
            permissions_json: self.permissions_json.clone().unwrap_or_default(),
        })
    }
}

/// 当前用户上下文（由会话中间件注入请求扩展）
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role_name: String,
    /// Raw JSON permission list copied from the session
    pub permissions_json: String,
}

impl CurrentUser {
    /// `Super Admin` / `Admin` 绕过权限检查
    pub fn is_privileged(&self) -> bool {
        self.role_name == "Super Admin" || self.role_name == "Admin"
    }

    /// Deserialized permission list. Malformed JSON is swallowed and
    /// treated as an empty set (fail closed).
    pub fn permissions(&self) -> Vec<String> {
        if self.permissions_json.is_empty() {
            return Vec::new();
        }
        serde_json::from_str(&self.permissions_json).unwrap_or_default()
    }

    /// Exact `Module.Action` or `Module.*` wildcard match
    pub fn has_permission(&self, module: &str, action: &str) -> bool {
        if self.is_privileged() {
            return true;
        }
        list_grants(&self.permissions(), module, action)
    }
}

struct SessionEntry {
    session: Session,
    last_seen: i64,
}

/// In-memory session store keyed by opaque UUID tokens
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, SessionEntry>>,
    ttl_ms: i64,
}

impl SessionStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl_ms: ttl_minutes * 60_000,
        }
    }

    /// Create an empty session, returning its token
    pub fn create(&self) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.inner.insert(
            token.clone(),
            SessionEntry {
                session: Session::default(),
                last_seen: now_millis(),
            },
        );
        token
    }

    pub fn contains(&self, token: &str) -> bool {
        self.inner.contains_key(token)
    }

    /// Read access; refreshes the idle timer.
    ///
    /// 闭包内禁止 await（持有 DashMap 分段锁）
    pub fn read<R>(&self, token: &str, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let mut entry = self.inner.get_mut(token)?;
        entry.last_seen = now_millis();
        Some(f(&entry.session))
    }

    /// Write access; refreshes the idle timer.
    pub fn write<R>(&self, token: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut entry = self.inner.get_mut(token)?;
        entry.last_seen = now_millis();
        Some(f(&mut entry.session))
    }

    /// Discard a session entirely (logout — cart included)
    pub fn remove(&self, token: &str) {
        self.inner.remove(token);
    }

    /// Drop sessions idle past the TTL; returns how many were removed
    pub fn sweep_expired(&self) -> usize {
        let cutoff = now_millis() - self.ttl_ms;
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.last_seen >= cutoff);
        before - self.inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Handle bound to one request's session
#[derive(Clone)]
pub struct SessionHandle {
    store: SessionStore,
    pub token: String,
}

impl SessionHandle {
    pub fn new(store: SessionStore, token: String) -> Self {
        Self { store, token }
    }

    pub fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> Option<R> {
        self.store.read(&self.token, f)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.store.write(&self.token, f)
    }

    /// Destroy the session (logout)
    pub fn destroy(&self) {
        self.store.remove(&self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> User {
        User {
            id,
            full_name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: None,
            password_hash: String::new(),
            avatar_url: None,
            email_verified: true,
            is_active: true,
            created_at: 0,
        }
    }

    #[test]
    fn session_lifecycle() {
        let store = SessionStore::new(30);
        let token = store.create();
        assert!(store.contains(&token));

        store.write(&token, |s| s.login(&user(7), "Customer", "[]".into()));
        let current = store.read(&token, |s| s.current_user()).flatten().unwrap();
        assert_eq!(current.id, 7);
        assert_eq!(current.role_name, "Customer");

        store.remove(&token);
        assert!(!store.contains(&token));
    }

    #[test]
    fn malformed_permissions_fail_closed() {
        let u = CurrentUser {
            id: 1,
            name: String::new(),
            email: String::new(),
            role_name: "Staff".to_string(),
            permissions_json: "{not json".to_string(),
        };
        assert!(u.permissions().is_empty());
        assert!(!u.has_permission("Order", "View"));
    }

    #[test]
    fn privileged_roles_bypass_permissions() {
        for role in ["Admin", "Super Admin"] {
            let u = CurrentUser {
                id: 1,
                name: String::new(),
                email: String::new(),
                role_name: role.to_string(),
                permissions_json: String::new(),
            };
            assert!(u.has_permission("Role", "Delete"));
        }
    }

    #[test]
    fn staff_wildcard_grants() {
        let u = CurrentUser {
            id: 1,
            name: String::new(),
            email: String::new(),
            role_name: "Staff".to_string(),
            permissions_json: r#"["Order.*","Chat.View"]"#.to_string(),
        };
        assert!(u.has_permission("Order", "Update"));
        assert!(u.has_permission("Chat", "View"));
        assert!(!u.has_permission("Chat", "Delete"));
    }

    #[test]
    fn sweep_removes_idle_sessions() {
        let store = SessionStore::new(0); // TTL 0 → everything is stale
        let _ = store.create();
        let _ = store.create();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(store.sweep_expired(), 2);
        assert!(store.is_empty());
    }
}
