//! ChatHub — 聊天室实时分发
//!
//! 管理 customer ↔ admin 的消息推送，独立于 HTTP 请求周期。
//!
//! ```text
//! WS handler (per connection)
//!       │ ClientCommand
//!       ▼
//! ChatHub
//!   ├── rooms: room_id → broadcast::Sender<HubEvent>
//!   │     （客户 + 正在查看该房间的管理员）
//!   └── admins: broadcast::Sender<HubEvent>
//!         （全体在线管理员：新消息提醒 / 房间删除）
//! ```
//!
//! 广播在消息持久化之后进行，顺序跟随持久化顺序（房间内单写者）。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use shared::chat::ChatEvent;
use tokio::sync::broadcast;

/// Broadcast channel 容量 — 足以缓冲重连时的突发
const BROADCAST_CAPACITY: usize = 256;

/// Event wrapper carrying the originating connection, so a sender can be
/// excluded from its own broadcast (optimistic UI on the sending side).
#[derive(Debug, Clone)]
pub struct HubEvent {
    pub origin: Option<u64>,
    pub event: ChatEvent,
}

/// 全局聊天 hub — 房间组 + admin 组
#[derive(Clone)]
pub struct ChatHub {
    rooms: Arc<DashMap<i64, broadcast::Sender<HubEvent>>>,
    admins: broadcast::Sender<HubEvent>,
    conn_counter: Arc<AtomicU64>,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatHub {
    pub fn new() -> Self {
        let (admins, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            rooms: Arc::new(DashMap::new()),
            admins,
            conn_counter: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Unique id for a new connection
    pub fn next_connection_id(&self) -> u64 {
        self.conn_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// 订阅房间组（组不存在时创建 — 重连重新加入走同一入口）
    pub fn subscribe_room(&self, room_id: i64) -> broadcast::Receiver<HubEvent> {
        self.rooms
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .subscribe()
    }

    /// 订阅 admin 组
    pub fn subscribe_admins(&self) -> broadcast::Receiver<HubEvent> {
        self.admins.subscribe()
    }

    /// Broadcast to one room. `origin` is excluded on the receiving side.
    pub fn publish_to_room(&self, room_id: i64, origin: Option<u64>, event: ChatEvent) {
        if let Some(tx) = self.rooms.get(&room_id) {
            // send 失败 = 无订阅者，安全忽略
            let _ = tx.send(HubEvent { origin, event });
        }
    }

    /// Broadcast to every connected admin
    pub fn publish_to_admins(&self, origin: Option<u64>, event: ChatEvent) {
        let _ = self.admins.send(HubEvent { origin, event });
    }

    /// Room deleted: reset the room's clients, tell admins to drop it
    /// from their lists, then forget the group.
    pub fn remove_room(&self, room_id: i64) {
        self.publish_to_room(room_id, None, ChatEvent::ChatReset);
        self.publish_to_admins(None, ChatEvent::RoomRemoved { room_id });
        self.rooms.remove(&room_id);
    }

    /// Drop a room group once its last subscriber disconnects
    pub fn gc_room(&self, room_id: i64) {
        if let Some(entry) = self.rooms.get(&room_id) {
            if entry.receiver_count() == 0 {
                drop(entry);
                self.rooms.remove(&room_id);
            }
        }
    }

    pub fn room_group_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::chat::MessageKind;

    fn user_message(room_id: i64) -> ChatEvent {
        ChatEvent::UserMessage {
            room_id,
            sender_id: 1,
            sender_name: "Alice".to_string(),
            avatar_url: None,
            content: "hi".to_string(),
            kind: MessageKind::Text,
        }
    }

    #[tokio::test]
    async fn room_fanout_reaches_all_subscribers() {
        let hub = ChatHub::new();
        let mut a = hub.subscribe_room(7);
        let mut b = hub.subscribe_room(7);

        hub.publish_to_room(7, None, user_message(7));

        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap().event {
                ChatEvent::UserMessage { room_id, .. } => assert_eq!(room_id, 7),
                other => panic!("expected UserMessage, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let hub = ChatHub::new();
        let mut a = hub.subscribe_room(1);
        let _b = hub.subscribe_room(2);

        hub.publish_to_room(2, None, user_message(2));
        assert!(matches!(
            a.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn origin_is_carried_for_caller_exclusion() {
        let hub = ChatHub::new();
        let conn = hub.next_connection_id();
        let mut rx = hub.subscribe_room(3);

        hub.publish_to_room(
            3,
            Some(conn),
            ChatEvent::AdminReply {
                room_id: 3,
                content: "ok".to_string(),
                kind: MessageKind::Text,
            },
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.origin, Some(conn));
    }

    #[tokio::test]
    async fn remove_room_resets_room_and_notifies_admins() {
        let hub = ChatHub::new();
        let mut room_rx = hub.subscribe_room(9);
        let mut admin_rx = hub.subscribe_admins();

        hub.remove_room(9);

        assert!(matches!(
            room_rx.recv().await.unwrap().event,
            ChatEvent::ChatReset
        ));
        match admin_rx.recv().await.unwrap().event {
            ChatEvent::RoomRemoved { room_id } => assert_eq!(room_id, 9),
            other => panic!("expected RoomRemoved, got {other:?}"),
        }
        assert_eq!(hub.room_group_count(), 0);
    }

    #[tokio::test]
    async fn gc_drops_empty_groups_only() {
        let hub = ChatHub::new();
        let rx = hub.subscribe_room(5);
        hub.gc_room(5);
        assert_eq!(hub.room_group_count(), 1);

        drop(rx);
        hub.gc_room(5);
        assert_eq!(hub.room_group_count(), 0);
    }

    #[tokio::test]
    async fn resubscribe_after_gc_recreates_group() {
        let hub = ChatHub::new();
        let rx = hub.subscribe_room(4);
        drop(rx);
        hub.gc_room(4);

        // Reconnection re-joins the previously known group
        let mut rx = hub.subscribe_room(4);
        hub.publish_to_room(4, None, user_message(4));
        assert!(rx.recv().await.is_ok());
    }
}
