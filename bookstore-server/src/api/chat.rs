//! Chat API — WebSocket endpoint + admin REST
//!
//! GET /api/chat/ws?token=<session>
//! Auth: 会话 token 走 query parameter（浏览器 WebSocket 不支持自定义 headers）
//!
//! 协议（shared::chat）:
//! - Server → Client: ChatEvent
//! - Client → Server: ClientCommand
//!
//! 每条连接一个任务：tokio::select! 轮询 30s 心跳、组事件队列和
//! 入站帧。组订阅通过转发任务把 broadcast 事件汇入连接自己的 mpsc
//! 队列，发送方自己的广播按连接 id 过滤（乐观 UI 去重）。

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use shared::chat::{ChatEvent, ClientCommand, HistoryMessage, MessageKind};
use shared::models::{ChatMessage, ChatRoomRow, UserResponse};

use crate::auth::{CurrentUser, SessionHandle};
use crate::chat::HubEvent;
use crate::core::ServerState;
use crate::db::repository::{chat, user};
use crate::utils::{AppError, AppResult};

/// 事件队列容量（单连接）
const EVENT_QUEUE: usize = 64;

// ========== WebSocket endpoint ==========

pub async fn chat_ws(
    State(state): State<ServerState>,
    Extension(session): Extension<SessionHandle>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    // 聊天必须登录（身份决定房间归属）
    let user = session
        .read(|s| s.current_user())
        .flatten()
        .ok_or(AppError::Unauthorized)?;

    let is_admin = user.is_privileged() || user.has_permission("Chat", "View");
    Ok(ws.on_upgrade(move |socket| chat_session(socket, state, user, is_admin)))
}

struct ChatConn {
    state: ServerState,
    user: CurrentUser,
    is_admin: bool,
    conn_id: u64,
    /// 组事件 → 本连接的队列
    events: mpsc::Sender<ChatEvent>,
    /// room_id → forwarder task
    joined: HashMap<i64, JoinHandle<()>>,
    admin_task: Option<JoinHandle<()>>,
}

impl ChatConn {
    /// Pump one broadcast subscription into the connection queue,
    /// dropping events that originated from this very connection.
    fn spawn_forwarder(
        mut rx: broadcast::Receiver<HubEvent>,
        events: mpsc::Sender<ChatEvent>,
        conn_id: u64,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(hub_event) => {
                        if hub_event.origin == Some(conn_id) {
                            continue;
                        }
                        if events.send(hub_event.event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(conn_id, lagged = n, "chat subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// 加入房间组（已加入则为 no-op — 重连/刷新天然幂等）
    fn join_room(&mut self, room_id: i64) {
        if self.joined.contains_key(&room_id) {
            return;
        }
        let rx = self.state.chat.subscribe_room(room_id);
        let task = Self::spawn_forwarder(rx, self.events.clone(), self.conn_id);
        self.joined.insert(room_id, task);
    }

    fn join_admin_group(&mut self) {
        if self.admin_task.is_some() {
            return;
        }
        let rx = self.state.chat.subscribe_admins();
        self.admin_task = Some(Self::spawn_forwarder(rx, self.events.clone(), self.conn_id));
    }

    async fn send_self(&self, event: ChatEvent) {
        let _ = self.events.send(event).await;
    }

    async fn error(&self, message: impl Into<String>) {
        self.send_self(ChatEvent::Error {
            message: message.into(),
        })
        .await;
    }

    async fn handle(&mut self, cmd: ClientCommand) {
        match cmd {
            ClientCommand::SendMessage { content, kind } => {
                self.handle_send_message(content, kind).await
            }
            ClientCommand::AdminReply {
                room_id,
                content,
                kind,
            } => self.handle_admin_reply(room_id, content, kind).await,
            ClientCommand::JoinRoom { room_id } => {
                if self.is_admin {
                    self.join_room(room_id);
                }
            }
            ClientCommand::JoinOwnRoom => self.handle_join_own_room().await,
            ClientCommand::GetHistory => self.handle_history().await,
            ClientCommand::DeleteRoom { room_id } => self.handle_delete_room(room_id).await,
        }
    }

    /// 客户消息：幂等建房 → 同步落库 → 广播 admin 组 + 房间组 → 回执
    async fn handle_send_message(&mut self, content: String, kind: MessageKind) {
        if content.is_empty() {
            return;
        }

        let room = match chat::get_or_create_room(&self.state.pool, self.user.id).await {
            Ok(room) => room,
            Err(e) => {
                tracing::error!("chat room lookup failed: {e}");
                return self.error("Failed to open chat room").await;
            }
        };
        self.join_room(room.id);

        if let Err(e) = chat::append_message(
            &self.state.pool,
            room.id,
            "User",
            self.user.id,
            &content,
            kind,
            false,
        )
        .await
        {
            tracing::error!("chat persist failed: {e}");
            return self.error("Failed to send message").await;
        }

        let avatar_url = user::find_by_id(&self.state.pool, self.user.id)
            .await
            .ok()
            .flatten()
            .and_then(|u| u.avatar_url);

        let event = ChatEvent::UserMessage {
            room_id: room.id,
            sender_id: self.user.id,
            sender_name: self.user.name.clone(),
            avatar_url,
            content: content.clone(),
            kind,
        };
        self.state.chat.publish_to_admins(None, event.clone());
        self.state
            .chat
            .publish_to_room(room.id, Some(self.conn_id), event);

        self.send_self(ChatEvent::MessageAck { content, kind }).await;
    }

    /// 管理员回复：房间必须已存在；广播时排除发送连接
    async fn handle_admin_reply(&mut self, room_id: i64, content: String, kind: MessageKind) {
        if !self.is_admin {
            return self.error("Admin role required").await;
        }

        match chat::find_room(&self.state.pool, room_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return self.error("Room no longer exists").await,
            Err(e) => {
                tracing::error!("chat room lookup failed: {e}");
                return self.error("Failed to reply").await;
            }
        }

        if let Err(e) = chat::append_message(
            &self.state.pool,
            room_id,
            "Admin",
            self.user.id,
            &content,
            kind,
            true,
        )
        .await
        {
            tracing::error!("chat persist failed: {e}");
            return self.error("Failed to reply").await;
        }

        self.join_room(room_id);
        self.state.chat.publish_to_room(
            room_id,
            Some(self.conn_id),
            ChatEvent::AdminReply {
                room_id,
                content: content.clone(),
                kind,
            },
        );
        self.send_self(ChatEvent::MessageAck { content, kind }).await;
    }

    /// 客户刷新后重新加入自己的房间
    async fn handle_join_own_room(&mut self) {
        if let Ok(Some(room)) = chat::find_room_by_user(&self.state.pool, self.user.id).await {
            self.join_room(room.id);
        }
    }

    /// 历史只发给调用者；顺带重新入组
    async fn handle_history(&mut self) {
        let room = match chat::find_room_by_user(&self.state.pool, self.user.id).await {
            Ok(Some(room)) => room,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("chat history lookup failed: {e}");
                return;
            }
        };

        match chat::history(&self.state.pool, room.id).await {
            Ok(messages) => {
                self.join_room(room.id);
                self.send_self(ChatEvent::History {
                    room_id: room.id,
                    messages: messages.iter().map(to_history).collect(),
                })
                .await;
            }
            Err(e) => tracing::error!("chat history fetch failed: {e}"),
        }
    }

    /// 删除房间：级联删消息 → admin 组移除 + 房间组重置
    async fn handle_delete_room(&mut self, room_id: i64) {
        if !self.is_admin {
            return self.error("Admin role required").await;
        }
        match chat::delete_room(&self.state.pool, room_id).await {
            Ok(true) => {
                self.state.chat.remove_room(room_id);
                if let Some(task) = self.joined.remove(&room_id) {
                    task.abort();
                }
                tracing::info!(room_id, admin = self.user.id, "chat room deleted");
            }
            Ok(false) => self.error("Room no longer exists").await,
            Err(e) => {
                tracing::error!("chat room delete failed: {e}");
                self.error("Failed to delete room").await;
            }
        }
    }

    fn cleanup(self) {
        for (room_id, task) in self.joined {
            task.abort();
            self.state.chat.gc_room(room_id);
        }
        if let Some(task) = self.admin_task {
            task.abort();
        }
    }
}

async fn chat_session(socket: WebSocket, state: ServerState, user: CurrentUser, is_admin: bool) {
    let conn_id = state.chat.next_connection_id();
    let (mut sink, mut stream): (SplitSink<WebSocket, Message>, SplitStream<WebSocket>) =
        socket.split();

    tracing::info!(conn_id, user_id = user.id, is_admin, "chat connected");

    let (events_tx, mut events_rx) = mpsc::channel::<ChatEvent>(EVENT_QUEUE);
    let mut conn = ChatConn {
        state: state.clone(),
        user,
        is_admin,
        conn_id,
        events: events_tx,
        joined: HashMap::new(),
        admin_task: None,
    };

    // 初始分组：管理员进 admin 组；客户重连自动回到自己的房间
    let mut ready_room = None;
    if is_admin {
        conn.join_admin_group();
    } else if let Ok(Some(room)) = chat::find_room_by_user(&state.pool, conn.user.id).await {
        conn.join_room(room.id);
        ready_room = Some(room.id);
    }
    conn.send_self(ChatEvent::Ready {
        room_id: ready_room,
    })
    .await;

    let mut ping_interval = tokio::time::interval(Duration::from_secs(30));
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            event = events_rx.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut sink, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientCommand>(&text) {
                            Ok(cmd) => conn.handle(cmd).await,
                            Err(e) => {
                                tracing::debug!(conn_id, "unparseable chat command: {e}");
                                conn.error("Unrecognized command").await;
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    tracing::info!(conn_id, "chat disconnected");
    conn.cleanup();
}

async fn send_event<S>(sink: &mut S, event: &ChatEvent) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(event).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

fn to_history(m: &ChatMessage) -> HistoryMessage {
    HistoryMessage {
        role: if m.sender_role == "Admin" {
            "admin".to_string()
        } else {
            "user".to_string()
        },
        content: m.content.clone(),
        kind: if m.kind == "Image" {
            MessageKind::Image
        } else {
            MessageKind::Text
        },
    }
}

// ========== Admin REST ==========

pub async fn admin_rooms(State(state): State<ServerState>) -> AppResult<Json<Vec<ChatRoomRow>>> {
    Ok(Json(chat::rooms(&state.pool).await?))
}

#[derive(Debug, serde::Serialize)]
pub struct RoomMessages {
    pub room_id: i64,
    pub messages: Vec<ChatMessage>,
}

/// 打开会话即标记该房间的客户消息为已读
pub async fn admin_room_messages(
    State(state): State<ServerState>,
    Path(room_id): Path<i64>,
) -> AppResult<Json<RoomMessages>> {
    if chat::find_room(&state.pool, room_id).await?.is_none() {
        return Err(AppError::not_found(format!("Room {room_id} not found")));
    }
    let messages = chat::history(&state.pool, room_id).await?;
    chat::mark_room_read(&state.pool, room_id).await?;
    Ok(Json(RoomMessages { room_id, messages }))
}

pub async fn admin_chat_user(
    State(state): State<ServerState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<UserResponse>> {
    let u = user::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;
    Ok(Json(u.into()))
}
