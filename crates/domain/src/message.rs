use chrono::Duration;
use serde::Serialize;

use crate::chat_room::{ChatRoom, RoomType};
use crate::value_objects::{MessageContent, MessageId, RoomId, Timestamp, UserId};
use crate::wire::wire_enum;

wire_enum! {
    /// 消息类型
    pub enum MessageType: "message_type" {
        Text => "text",
        Image => "image",
        /// 入场、退场等系统提示
        System => "system",
    }
}

/// 消息过期策略：过期时间只由所属聊天室的类别决定，创建时计算一次
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiryPolicy;

impl ExpiryPolicy {
    pub const PUBLIC_ROOM_TTL_HOURS: i64 = 6;
    pub const PRIVATE_ROOM_TTL_HOURS: i64 = 24;

    pub fn lifetime(room_type: RoomType) -> Option<Duration> {
        match room_type {
            RoomType::Public => Some(Duration::hours(Self::PUBLIC_ROOM_TTL_HOURS)),
            RoomType::Private => Some(Duration::hours(Self::PRIVATE_ROOM_TTL_HOURS)),
        }
    }

    pub fn expires_at(room_type: RoomType, created_at: Timestamp) -> Option<Timestamp> {
        Self::lifetime(room_type).map(|ttl| created_at + ttl)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub author_id: UserId,
    pub content: MessageContent,
    pub message_type: MessageType,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(skip_serializing)]
    pub deleted_at: Option<Timestamp>,
}

impl Message {
    /// 仅当设置了过期时间且 `now` 严格晚于它时才算过期
    pub fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expires_at, Some(expires_at) if now > expires_at)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// 待插入的消息，过期时间在持久化之前就已确定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub author_id: UserId,
    pub content: MessageContent,
    pub message_type: MessageType,
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl NewMessage {
    /// 按聊天室类别盖上过期时间
    pub fn for_room(
        room: &ChatRoom,
        author_id: UserId,
        content: MessageContent,
        message_type: MessageType,
        created_at: Timestamp,
    ) -> Self {
        Self {
            room_id: room.id,
            author_id,
            content,
            message_type,
            expires_at: ExpiryPolicy::expires_at(room.room_type, created_at),
            created_at,
        }
    }

    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            room_id: self.room_id,
            author_id: self.author_id,
            content: self.content,
            message_type: self.message_type,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.created_at,
            deleted_at: None,
        }
    }
}
