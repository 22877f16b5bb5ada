//! 实时聊天子系统
//!
//! [`hub`] 负责组管理与扇出；WebSocket 端点和管理端 REST 在
//! `api::chat` 中。

pub mod hub;

pub use hub::{ChatHub, HubEvent};
