use async_trait::async_trait;
use domain::{
    ChatRoom, Destination, Message, NewChatRoom, NewMessage, NewUser, RepositoryError,
    RoomId, Timestamp, User, UserEmail, UserId,
};

/// 所有查询只返回未软删除的记录
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 邮箱已被未删除的用户占用时返回 `Conflict`
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError>;
    /// 按创建时间倒序分页
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, RepositoryError>;
    async fn list_by_destination(
        &self,
        destination: Destination,
    ) -> Result<Vec<User>, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
    /// 只更新最后活跃时间
    async fn touch_last_active(&self, id: UserId, at: Timestamp) -> Result<(), RepositoryError>;
    async fn delete(&self, id: UserId, at: Timestamp) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRoomRepository: Send + Sync {
    /// 同一目的地已存在未删除的公共聊天室时返回 `Conflict`
    async fn create(&self, room: NewChatRoom) -> Result<ChatRoom, RepositoryError>;
    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError>;
    async fn find_public(
        &self,
        destination: Destination,
    ) -> Result<Option<ChatRoom>, RepositoryError>;
    async fn delete(&self, id: RoomId, at: Timestamp) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 按原样保存，过期时间由调用方事先确定
    async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError>;
    /// 最新的消息在前，不按过期时间过滤
    async fn list_by_room(&self, room_id: RoomId, limit: i64)
        -> Result<Vec<Message>, RepositoryError>;
    /// 软删除所有过期时间严格早于 `before` 的消息，返回受影响的条数
    async fn purge_expired(&self, before: Timestamp) -> Result<u64, RepositoryError>;
}
