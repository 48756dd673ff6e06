//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：令牌的签发与校验、用户资料、
//! 目的地聊天室解析以及消息的过期清理，并定义对存储、密码哈希和时钟的抽象。

pub mod clock;
pub mod credential;
pub mod dto;
pub mod error;
pub mod memory;
pub mod password;
pub mod repository;
pub mod services;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::{
    CredentialError, CredentialService, CredentialSettings, Identity, TokenPair, TokenType,
    VerifiedCredential,
};
pub use error::ApplicationError;
pub use password::{PasswordHasher, PasswordHasherError};
pub use repository::{ChatRoomRepository, MessageRepository, UserRepository};
pub use services::{
    ExpiredMessageSweeper, MessageService, MessageServiceDependencies, ProfileService,
    ProfileServiceDependencies, RoomService, RoomServiceDependencies,
};
