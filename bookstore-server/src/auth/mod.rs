//! 认证与授权
//!
//! 会话存储、密码哈希、权限目录与路由中间件。

pub mod middleware;
pub mod password;
pub mod permissions;
pub mod session;

pub use middleware::{require_admin, require_login, require_permission, session_layer};
pub use password::{hash_password, verify_password};
pub use session::{CurrentUser, Session, SessionHandle, SessionStore};
