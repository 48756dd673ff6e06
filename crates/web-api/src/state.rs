use std::sync::Arc;
use std::time::Duration;

use application::{CredentialService, MessageService, ProfileService, RoomService};

#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileService>,
    pub rooms: Arc<RoomService>,
    pub messages: Arc<MessageService>,
    pub credentials: Arc<CredentialService>,
    /// 单次请求的处理时限，两种传输共用
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        profiles: Arc<ProfileService>,
        rooms: Arc<RoomService>,
        messages: Arc<MessageService>,
        credentials: Arc<CredentialService>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            profiles,
            rooms,
            messages,
            credentials,
            request_timeout,
        }
    }
}
