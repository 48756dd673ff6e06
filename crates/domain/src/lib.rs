//! 旅行匹配系统核心领域模型
//!
//! 包含用户、目的地聊天室、消息等核心实体，以及目的地键、出行计划校验、
//! 消息过期策略等纯业务规则。

pub mod chat_room;
pub mod destination;
pub mod errors;
pub mod message;
pub mod user;
pub mod value_objects;
mod wire;

pub use chat_room::{ChatRoom, NewChatRoom, RoomType};
pub use destination::{
    format_destination, normalize_destination, parse_destination, validate_destination,
    Destination, DestinationKey, DESTINATION_DELIMITER,
};
pub use errors::{DomainError, DomainResult, RepositoryError};
pub use message::{ExpiryPolicy, Message, MessageType, NewMessage};
pub use user::{
    ActivityStatus, Gender, NewUser, TravelPlan, TravelPurpose, TravelStyle, User,
    MIN_PASSWORD_LENGTH,
};
pub use value_objects::{
    MessageContent, MessageId, PasswordHash, RoomId, Timestamp, UserEmail, UserId,
};
