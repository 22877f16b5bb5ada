//! Chat Persistence Models

use serde::{Deserialize, Serialize};

/// One conversation per customer (`user_id` is unique)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ChatRoom {
    pub id: i64,
    pub user_id: i64,
    /// 最后一条消息的预览缓存
    pub last_message: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ChatMessage {
    pub id: i64,
    pub room_id: i64,
    /// "User" or "Admin"
    pub sender_role: String,
    pub sender_id: i64,
    pub content: String,
    /// "Text" or "Image"
    pub kind: String,
    pub is_read: bool,
    pub created_at: i64,
}

/// Admin room-list row with customer info and unread count
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ChatRoomRow {
    pub id: i64,
    pub user_id: i64,
    pub last_message: String,
    pub updated_at: i64,
    pub user_name: String,
    pub user_email: String,
    pub avatar_url: Option<String>,
    pub unread_count: i64,
}
