mod message_service;
mod profile_service;
mod room_service;

pub use message_service::{
    ExpiredMessageSweeper, MessageService, MessageServiceDependencies, DEFAULT_MESSAGE_LIMIT,
    MAX_MESSAGE_LIMIT,
};
pub use profile_service::{ProfileService, ProfileServiceDependencies};
pub use room_service::{RoomService, RoomServiceDependencies};
