//! Chat WebSocket protocol
//!
//! Server → Client: ChatEvent (推送)
//! Client → Server: ClientCommand (发送消息 + 群组控制)
//!
//! 连接按会话角色分组：
//! - 每个房间一个组（客户 + 正在查看该房间的管理员）
//! - 所有管理员共享一个 admin 组（新消息 / 房间删除通知）

use serde::{Deserialize, Serialize};

/// Message body kind. Image messages carry a URL in `content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Text,
    Image,
}

impl MessageKind {
    /// 房间 last-message 缓存里图片消息的占位文本
    pub fn preview<'a>(&self, content: &'a str) -> &'a str {
        match self {
            MessageKind::Text => content,
            MessageKind::Image => "[image]",
        }
    }
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Text
    }
}

/// Client → Server 命令
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// 客户发送消息（房间不存在时自动创建）
    SendMessage {
        content: String,
        #[serde(default)]
        kind: MessageKind,
    },

    /// 管理员回复指定房间
    AdminReply {
        room_id: i64,
        content: String,
        #[serde(default)]
        kind: MessageKind,
    },

    /// 管理员订阅某个房间的推送
    JoinRoom { room_id: i64 },

    /// 客户刷新后重新加入自己的房间
    JoinOwnRoom,

    /// 拉取调用者自己房间的历史消息
    GetHistory,

    /// 管理员删除房间（级联删除消息）
    DeleteRoom { room_id: i64 },
}

/// Server → Client 推送
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    /// 握手完成
    Ready {
        #[serde(skip_serializing_if = "Option::is_none")]
        room_id: Option<i64>,
    },

    /// 客户消息（广播到 admin 组 + 房间组）
    UserMessage {
        room_id: i64,
        sender_id: i64,
        sender_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        avatar_url: Option<String>,
        content: String,
        kind: MessageKind,
    },

    /// 管理员回复（广播到房间组，发送连接除外）
    AdminReply {
        room_id: i64,
        content: String,
        kind: MessageKind,
    },

    /// 发送确认（仅回给调用者）
    MessageAck { content: String, kind: MessageKind },

    /// 历史消息（仅回给调用者，按持久化顺序）
    History {
        room_id: i64,
        messages: Vec<HistoryMessage>,
    },

    /// 房间已删除（admin 组：从列表移除）
    RoomRemoved { room_id: i64 },

    /// 房间已删除（房间组：客户端重置聊天窗口）
    ChatReset,

    /// 操作错误（仅回给调用者）
    Error { message: String },
}

/// 历史记录条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// "admin" or "user"
    pub role: String,
    pub content: String,
    pub kind: MessageKind,
}
