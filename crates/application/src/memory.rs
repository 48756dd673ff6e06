//! 进程内的仓储实现
//!
//! 用于测试和本地运行。公共聊天室与邮箱的唯一性规则与数据库约束一致，
//! 写锁保证"检查并插入"是原子的。

use std::collections::BTreeMap;

use async_trait::async_trait;
use domain::{
    ChatRoom, Destination, Message, MessageId, NewChatRoom, NewMessage, NewUser, RepositoryError,
    RoomId, RoomType, Timestamp, User, UserEmail, UserId,
};
use tokio::sync::RwLock;

use crate::repository::{ChatRoomRepository, MessageRepository, UserRepository};

struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

struct UserRow {
    user: User,
    deleted_at: Option<Timestamp>,
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<Table<UserRow>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(users: &mut [User]) {
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut table = self.table.write().await;
        let taken = table
            .rows
            .values()
            .any(|row| row.deleted_at.is_none() && row.user.email == user.email);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        let id = table.allocate();
        let stored = user.into_user(UserId(id));
        table.rows.insert(
            id,
            UserRow {
                user: stored.clone(),
                deleted_at: None,
            },
        );
        Ok(stored)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&user.id.0) {
            Some(row) if row.deleted_at.is_none() => {
                row.user = user.clone();
                Ok(user)
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .get(&id.0)
            .filter(|row| row.deleted_at.is_none())
            .map(|row| row.user.clone()))
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|row| row.deleted_at.is_none() && row.user.email == email)
            .map(|row| row.user.clone()))
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, RepositoryError> {
        let table = self.table.read().await;
        let mut users: Vec<User> = table
            .rows
            .values()
            .filter(|row| row.deleted_at.is_none())
            .map(|row| row.user.clone())
            .collect();
        newest_first(&mut users);
        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn list_by_destination(
        &self,
        destination: Destination,
    ) -> Result<Vec<User>, RepositoryError> {
        let table = self.table.read().await;
        let mut users: Vec<User> = table
            .rows
            .values()
            .filter(|row| {
                row.deleted_at.is_none()
                    && row.user.country == destination.country()
                    && row.user.city == destination.city()
            })
            .map(|row| row.user.clone())
            .collect();
        newest_first(&mut users);
        Ok(users)
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|row| row.deleted_at.is_none())
            .count() as i64)
    }

    async fn touch_last_active(&self, id: UserId, at: Timestamp) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&id.0) {
            Some(row) if row.deleted_at.is_none() => {
                row.user.touch(at);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: UserId, at: Timestamp) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&id.0) {
            Some(row) if row.deleted_at.is_none() => {
                row.deleted_at = Some(at);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }
}

#[derive(Default)]
pub struct InMemoryChatRoomRepository {
    table: RwLock<Table<ChatRoom>>,
}

impl InMemoryChatRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 包括已删除的在内的聊天室总数
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn is_live_public(room: &ChatRoom, country: &str, city: &str) -> bool {
    room.room_type == RoomType::Public
        && room.deleted_at.is_none()
        && room.country == country
        && room.city == city
}

#[async_trait]
impl ChatRoomRepository for InMemoryChatRoomRepository {
    async fn create(&self, room: NewChatRoom) -> Result<ChatRoom, RepositoryError> {
        let mut table = self.table.write().await;
        if room.room_type == RoomType::Public
            && table
                .rows
                .values()
                .any(|existing| is_live_public(existing, &room.country, &room.city))
        {
            return Err(RepositoryError::Conflict);
        }
        let id = table.allocate();
        let stored = room.into_room(RoomId(id));
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .get(&id.0)
            .filter(|room| !room.is_deleted())
            .cloned())
    }

    async fn find_public(
        &self,
        destination: Destination,
    ) -> Result<Option<ChatRoom>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|room| is_live_public(room, destination.country(), destination.city()))
            .cloned())
    }

    async fn delete(&self, id: RoomId, at: Timestamp) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&id.0) {
            Some(room) if !room.is_deleted() => {
                room.deleted_at = Some(at);
                room.updated_at = at;
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    table: RwLock<Table<Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let mut table = self.table.write().await;
        let id = table.allocate();
        let stored = message.into_message(MessageId(id));
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn list_by_room(
        &self,
        room_id: RoomId,
        limit: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let table = self.table.read().await;
        let mut messages: Vec<Message> = table
            .rows
            .values()
            .filter(|message| message.room_id == room_id && !message.is_deleted())
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        messages.truncate(limit.max(0) as usize);
        Ok(messages)
    }

    async fn purge_expired(&self, before: Timestamp) -> Result<u64, RepositoryError> {
        let mut table = self.table.write().await;
        let mut purged = 0;
        for message in table.rows.values_mut() {
            let expired = matches!(message.expires_at, Some(expires_at) if expires_at < before);
            if expired && !message.is_deleted() {
                message.deleted_at = Some(before);
                purged += 1;
            }
        }
        Ok(purged)
    }
}
