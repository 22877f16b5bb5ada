//! Chat Repository
//!
//! 一个客户至多一个房间（`chat_room.user_id` 唯一约束）。
//! 房间创建走 INSERT OR IGNORE + 回查，天然幂等。

use super::{RepoError, RepoResult};
use shared::chat::MessageKind;
use shared::models::{ChatMessage, ChatRoom, ChatRoomRow};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

const ROOM_SELECT: &str = "SELECT id, user_id, last_message, updated_at FROM chat_room";

const MESSAGE_SELECT: &str =
    "SELECT id, room_id, sender_role, sender_id, content, kind, is_read, created_at FROM chat_message";

pub async fn find_room(pool: &SqlitePool, room_id: i64) -> RepoResult<Option<ChatRoom>> {
    let sql = format!("{ROOM_SELECT} WHERE id = ?");
    Ok(sqlx::query_as::<_, ChatRoom>(&sql)
        .bind(room_id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_room_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Option<ChatRoom>> {
    let sql = format!("{ROOM_SELECT} WHERE user_id = ?");
    Ok(sqlx::query_as::<_, ChatRoom>(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?)
}

/// Idempotent get-or-create: concurrent first messages from the same
/// user converge on one room.
pub async fn get_or_create_room(pool: &SqlitePool, user_id: i64) -> RepoResult<ChatRoom> {
    sqlx::query(
        "INSERT OR IGNORE INTO chat_room (id, user_id, last_message, updated_at) VALUES (?, ?, '', ?)",
    )
    .bind(snowflake_id())
    .bind(user_id)
    .bind(now_millis())
    .execute(pool)
    .await?;

    find_room_by_user(pool, user_id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create chat room".into()))
}

/// Persist one message and refresh the room's last-message cache.
/// 同步落库后调用方才广播，保证广播顺序跟随持久化顺序。
pub async fn append_message(
    pool: &SqlitePool,
    room_id: i64,
    sender_role: &str,
    sender_id: i64,
    content: &str,
    kind: MessageKind,
    is_read: bool,
) -> RepoResult<ChatMessage> {
    let now = now_millis();
    let id = snowflake_id();
    let kind_str = match kind {
        MessageKind::Text => "Text",
        MessageKind::Image => "Image",
    };

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO chat_message (id, room_id, sender_role, sender_id, content, kind, is_read, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(room_id)
    .bind(sender_role)
    .bind(sender_id)
    .bind(content)
    .bind(kind_str)
    .bind(is_read)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE chat_room SET last_message = ?, updated_at = ? WHERE id = ?")
        .bind(kind.preview(content))
        .bind(now)
        .bind(room_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let sql = format!("{MESSAGE_SELECT} WHERE id = ?");
    sqlx::query_as::<_, ChatMessage>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to append chat message".into()))
}

/// Room history in persistence order
pub async fn history(pool: &SqlitePool, room_id: i64) -> RepoResult<Vec<ChatMessage>> {
    let sql = format!("{MESSAGE_SELECT} WHERE room_id = ? ORDER BY created_at, id");
    Ok(sqlx::query_as::<_, ChatMessage>(&sql)
        .bind(room_id)
        .fetch_all(pool)
        .await?)
}

/// Admin room list, most recently active first, with unread counts
pub async fn rooms(pool: &SqlitePool) -> RepoResult<Vec<ChatRoomRow>> {
    Ok(sqlx::query_as::<_, ChatRoomRow>(
        "SELECT r.id, r.user_id, r.last_message, r.updated_at, u.full_name AS user_name, u.email AS user_email, u.avatar_url, (SELECT COUNT(*) FROM chat_message m WHERE m.room_id = r.id AND m.sender_role = 'User' AND m.is_read = 0) AS unread_count FROM chat_room r JOIN user u ON u.id = r.user_id ORDER BY r.updated_at DESC",
    )
    .fetch_all(pool)
    .await?)
}

/// Mark a room's customer messages read (admin opened the conversation)
pub async fn mark_room_read(pool: &SqlitePool, room_id: i64) -> RepoResult<i64> {
    let rows = sqlx::query(
        "UPDATE chat_message SET is_read = 1 WHERE room_id = ? AND sender_role = 'User' AND is_read = 0",
    )
    .bind(room_id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() as i64)
}

/// Cascade delete: messages first, then the room
pub async fn delete_room(pool: &SqlitePool, room_id: i64) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM chat_message WHERE room_id = ?")
        .bind(room_id)
        .execute(&mut *tx)
        .await?;
    let rows = sqlx::query("DELETE FROM chat_room WHERE id = ?")
        .bind(room_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::user;
    use crate::db::DbService;

    async fn seed_user(pool: &SqlitePool) -> i64 {
        user::create(pool, "Chatter", "chat@example.com", None, "h", true)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn room_creation_is_idempotent() {
        let db = DbService::in_memory().await.unwrap();
        let user_id = seed_user(&db.pool).await;

        let a = get_or_create_room(&db.pool, user_id).await.unwrap();
        let b = get_or_create_room(&db.pool, user_id).await.unwrap();
        assert_eq!(a.id, b.id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_room WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn append_updates_last_message_cache() {
        let db = DbService::in_memory().await.unwrap();
        let user_id = seed_user(&db.pool).await;
        let room = get_or_create_room(&db.pool, user_id).await.unwrap();

        append_message(&db.pool, room.id, "User", user_id, "hello", MessageKind::Text, false)
            .await
            .unwrap();
        append_message(
            &db.pool,
            room.id,
            "User",
            user_id,
            "/img/x.png",
            MessageKind::Image,
            false,
        )
        .await
        .unwrap();

        let room = find_room(&db.pool, room.id).await.unwrap().unwrap();
        assert_eq!(room.last_message, "[image]");

        let msgs = history(&db.pool, room.id).await.unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].content, "hello");
    }

    #[tokio::test]
    async fn unread_counts_and_mark_read() {
        let db = DbService::in_memory().await.unwrap();
        let user_id = seed_user(&db.pool).await;
        let room = get_or_create_room(&db.pool, user_id).await.unwrap();

        append_message(&db.pool, room.id, "User", user_id, "a", MessageKind::Text, false)
            .await
            .unwrap();
        append_message(&db.pool, room.id, "Admin", 0, "b", MessageKind::Text, true)
            .await
            .unwrap();

        let rows = rooms(&db.pool).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].unread_count, 1);

        assert_eq!(mark_room_read(&db.pool, room.id).await.unwrap(), 1);
        let rows = rooms(&db.pool).await.unwrap();
        assert_eq!(rows[0].unread_count, 0);
    }

    #[tokio::test]
    async fn delete_room_cascades_messages() {
        let db = DbService::in_memory().await.unwrap();
        let user_id = seed_user(&db.pool).await;
        let room = get_or_create_room(&db.pool, user_id).await.unwrap();
        append_message(&db.pool, room.id, "User", user_id, "bye", MessageKind::Text, false)
            .await
            .unwrap();

        assert!(delete_room(&db.pool, room.id).await.unwrap());
        assert!(find_room(&db.pool, room.id).await.unwrap().is_none());
        assert!(history(&db.pool, room.id).await.unwrap().is_empty());
    }
}
