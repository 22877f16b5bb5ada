//! Bookstore Server - 在线书店后端
//!
//! # 架构概述
//!
//! 本 crate 是书店服务的主入口，提供以下核心功能：
//!
//! - **会话** (`auth::session`): 服务端会话（认证 + 购物车）
//! - **权限门** (`auth::middleware`): `Module.Action` RBAC 检查
//! - **数据库** (`db`): SQLite (sqlx) 仓储层
//! - **聊天** (`chat` + `api::chat`): WebSocket 分组推送
//! - **HTTP API** (`api`): RESTful 接口
//!
//! # 模块结构
//!
//! ```text
//! bookstore-server/src/
//! ├── core/       # 配置、状态、服务器
//! ├── auth/       # 会话、密码、权限
//! ├── api/        # HTTP/WS 路由和处理器
//! ├── cart/       # 会话购物车
//! ├── chat/       # 聊天 hub
//! ├── db/         # 数据库层
//! ├── services/   # 邮件 / 短信
//! └── utils/      # 错误、日志
//! ```

pub mod api;
pub mod auth;
pub mod cart;
pub mod chat;
pub mod core;
pub mod db;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, SessionStore};
pub use cart::Cart;
pub use chat::ChatHub;
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
