use serde::Serialize;

use crate::destination::{format_destination, Destination, DestinationKey};
use crate::value_objects::{RoomId, Timestamp};
use crate::wire::wire_enum;

wire_enum! {
    /// 聊天室类别
    pub enum RoomType: "room_type" {
        /// 目的地公共聊天室，每个目的地至多一个
        Public => "public",
        /// 两名旅行者配对时创建的私聊室
        Private => "private",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRoom {
    pub id: RoomId,
    pub country: String,
    pub city: String,
    pub room_type: RoomType,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(skip_serializing)]
    pub deleted_at: Option<Timestamp>,
}

impl ChatRoom {
    pub fn room_key(&self) -> DestinationKey {
        format_destination(&self.country, &self.city)
    }

    pub fn is_public(&self) -> bool {
        self.room_type == RoomType::Public
    }

    pub fn is_private(&self) -> bool {
        self.room_type == RoomType::Private
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// 待插入的聊天室记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatRoom {
    pub country: String,
    pub city: String,
    pub room_type: RoomType,
    pub name: String,
    pub created_at: Timestamp,
}

impl NewChatRoom {
    /// 目的地公共聊天室，名称由国家和城市确定
    pub fn public(destination: &Destination, now: Timestamp) -> Self {
        Self {
            country: destination.country().to_owned(),
            city: destination.city().to_owned(),
            room_type: RoomType::Public,
            name: format!("{} {} Travelers Chat", destination.country(), destination.city()),
            created_at: now,
        }
    }

    /// 私聊室，名称由双方显示名确定
    pub fn private(
        destination: &Destination,
        first_name: &str,
        second_name: &str,
        now: Timestamp,
    ) -> Self {
        Self {
            country: destination.country().to_owned(),
            city: destination.city().to_owned(),
            room_type: RoomType::Private,
            name: format!("{} & {}", first_name.trim(), second_name.trim()),
            created_at: now,
        }
    }

    pub fn into_room(self, id: RoomId) -> ChatRoom {
        ChatRoom {
            id,
            country: self.country,
            city: self.city,
            room_type: self.room_type,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.created_at,
            deleted_at: None,
        }
    }
}
