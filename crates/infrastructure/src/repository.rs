use std::sync::Arc;
use std::time::Duration;

use application::repository::{ChatRoomRepository, MessageRepository, UserRepository};
use async_trait::async_trait;
use config::DatabaseConfig;
use domain::{
    ChatRoom, Destination, Message, MessageContent, MessageId, NewChatRoom, NewMessage, NewUser,
    PasswordHash, RepositoryError, RoomId, Timestamp, User, UserEmail, UserId,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::PoolTimedOut => RepositoryError::Timeout,
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
        other => {
            tracing::error!(error = %other, "database operation failed");
            RepositoryError::storage(other.to_string())
        }
    }
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

fn parse_column<T>(value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|err: T::Err| invalid_data(err.to_string()))
}

const USER_COLUMNS: &str = "id, email, password_hash, name, age, gender, profile_pic, country, city, \
     travel_start, travel_end, bio, travel_purpose, travel_budget, travel_style, last_active, \
     created_at, updated_at";

#[derive(Debug, FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    password_hash: String,
    name: String,
    age: i32,
    gender: String,
    profile_pic: String,
    country: String,
    city: String,
    travel_start: Timestamp,
    travel_end: Timestamp,
    bio: String,
    travel_purpose: String,
    travel_budget: i32,
    travel_style: String,
    last_active: Timestamp,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let email = UserEmail::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password =
            PasswordHash::new(value.password_hash).map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId(value.id),
            email,
            password,
            name: value.name,
            age: value.age,
            gender: parse_column(&value.gender)?,
            profile_pic: value.profile_pic,
            country: value.country,
            city: value.city,
            travel_start: value.travel_start,
            travel_end: value.travel_end,
            bio: value.bio,
            travel_purpose: parse_column(&value.travel_purpose)?,
            travel_budget: value.travel_budget,
            travel_style: parse_column(&value.travel_style)?,
            last_active: value.last_active,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RoomRecord {
    id: i64,
    country: String,
    city: String,
    room_type: String,
    name: String,
    created_at: Timestamp,
    updated_at: Timestamp,
    deleted_at: Option<Timestamp>,
}

impl TryFrom<RoomRecord> for ChatRoom {
    type Error = RepositoryError;

    fn try_from(value: RoomRecord) -> Result<Self, Self::Error> {
        Ok(ChatRoom {
            id: RoomId(value.id),
            country: value.country,
            city: value.city,
            room_type: parse_column(&value.room_type)?,
            name: value.name,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: i64,
    room_id: i64,
    author_id: i64,
    content: String,
    message_type: String,
    expires_at: Option<Timestamp>,
    created_at: Timestamp,
    updated_at: Timestamp,
    deleted_at: Option<Timestamp>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content =
            MessageContent::new(value.content).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Message {
            id: MessageId(value.id),
            room_id: RoomId(value.room_id),
            author_id: UserId(value.author_id),
            content,
            message_type: parse_column(&value.message_type)?,
            expires_at: value.expires_at,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, age, gender, profile_pic, country, city,
                               travel_start, travel_end, bio, travel_purpose, travel_budget,
                               travel_style, last_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15, $15)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(&user.name)
        .bind(user.age)
        .bind(user.gender.as_str())
        .bind(&user.profile_pic)
        .bind(&user.country)
        .bind(&user.city)
        .bind(user.travel_plan.start)
        .bind(user.travel_plan.end)
        .bind(&user.bio)
        .bind(user.travel_purpose.as_str())
        .bind(user.travel_budget)
        .bind(user.travel_style.as_str())
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, name = $4, age = $5, gender = $6,
                profile_pic = $7, country = $8, city = $9, travel_start = $10, travel_end = $11,
                bio = $12, travel_purpose = $13, travel_budget = $14, travel_style = $15,
                last_active = $16, updated_at = $17
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id.0)
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(&user.name)
        .bind(user.age)
        .bind(user.gender.as_str())
        .bind(&user.profile_pic)
        .bind(&user.country)
        .bind(&user.city)
        .bind(user.travel_start)
        .bind(user.travel_end)
        .bind(&user.bio)
        .bind(user.travel_purpose.as_str())
        .bind(user.travel_budget)
        .bind(user.travel_style.as_str())
        .bind(user.last_active)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: UserEmail) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            OFFSET $1 LIMIT $2
            "#
        ))
        .bind(offset.max(0))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }

    async fn list_by_destination(
        &self,
        destination: Destination,
    ) -> Result<Vec<User>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE country = $1 AND city = $2 AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(destination.country())
        .bind(destination.city())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)
    }

    async fn touch_last_active(&self, id: UserId, at: Timestamp) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET last_active = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: UserId, at: Timestamp) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

const ROOM_COLUMNS: &str = "id, country, city, room_type, name, created_at, updated_at, deleted_at";

#[derive(Clone)]
pub struct PgChatRoomRepository {
    pool: PgPool,
}

impl PgChatRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRoomRepository for PgChatRoomRepository {
    /// 公共聊天室的唯一性由部分唯一索引保证，冲突时返回 `Conflict`
    async fn create(&self, room: NewChatRoom) -> Result<ChatRoom, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            r#"
            INSERT INTO chat_rooms (country, city, room_type, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {ROOM_COLUMNS}
            "#
        ))
        .bind(&room.country)
        .bind(&room.city)
        .bind(room.room_type.as_str())
        .bind(&room.name)
        .bind(room.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        ChatRoom::try_from(record)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(ChatRoom::try_from).transpose()
    }

    async fn find_public(
        &self,
        destination: Destination,
    ) -> Result<Option<ChatRoom>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            r#"
            SELECT {ROOM_COLUMNS} FROM chat_rooms
            WHERE country = $1 AND city = $2 AND room_type = 'public' AND deleted_at IS NULL
            "#
        ))
        .bind(destination.country())
        .bind(destination.city())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(ChatRoom::try_from).transpose()
    }

    async fn delete(&self, id: RoomId, at: Timestamp) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE chat_rooms SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

const MESSAGE_COLUMNS: &str =
    "id, room_id, author_id, content, message_type, expires_at, created_at, updated_at, deleted_at";

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            INSERT INTO messages (room_id, author_id, content, message_type, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(message.room_id.0)
        .bind(message.author_id.0)
        .bind(message.content.as_str())
        .bind(message.message_type.as_str())
        .bind(message.expires_at)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn list_by_room(
        &self,
        room_id: RoomId,
        limit: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE room_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(room_id.0)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn purge_expired(&self, before: Timestamp) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET deleted_at = $1, updated_at = $1
            WHERE expires_at IS NOT NULL AND expires_at < $1 AND deleted_at IS NULL
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }
}

pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub room_repository: Arc<PgChatRoomRepository>,
    pub message_repository: Arc<PgMessageRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            room_repository: Arc::new(PgChatRoomRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await
}
