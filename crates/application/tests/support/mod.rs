#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use application::{
    dto::RegisterRequest,
    memory::{InMemoryChatRoomRepository, InMemoryMessageRepository, InMemoryUserRepository},
    CredentialService, CredentialSettings, ManualClock, MessageService,
    MessageServiceDependencies, PasswordHasher, PasswordHasherError, ProfileService,
    ProfileServiceDependencies, RoomService, RoomServiceDependencies,
};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use domain::{Gender, PasswordHash, Timestamp, TravelPurpose, TravelStyle};

pub const SECRET: &str = "integration-secret-key-with-enough-length";

/// 可逆的假哈希，只用于测试；记录 verify 调用次数
#[derive(Default)]
pub struct TestHasher {
    verify_calls: AtomicUsize,
}

impl TestHasher {
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PasswordHasher for TestHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        PasswordHash::new(format!("hashed:{plaintext}"))
            .map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(hashed.as_str() == format!("hashed:{plaintext}"))
    }
}

pub fn start_time() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub hasher: Arc<TestHasher>,
    pub users: Arc<InMemoryUserRepository>,
    pub rooms: Arc<InMemoryChatRoomRepository>,
    pub credentials: Arc<CredentialService>,
    pub profiles: ProfileService,
    pub room_service: Arc<RoomService>,
    pub messages: Arc<MessageService>,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let hasher = Arc::new(TestHasher::default());
        let users = Arc::new(InMemoryUserRepository::new());
        let rooms = Arc::new(InMemoryChatRoomRepository::new());
        let credentials = Arc::new(CredentialService::new(
            CredentialSettings {
                secret: SECRET.to_string(),
                issuer: "travel-chat".to_string(),
                access_ttl: Duration::hours(24),
                refresh_ttl: Duration::days(7),
            },
            clock.clone(),
        ));

        let profiles = ProfileService::new(ProfileServiceDependencies {
            user_repository: users.clone(),
            password_hasher: hasher.clone(),
            credentials: credentials.clone(),
            clock: clock.clone(),
        });
        let room_service = Arc::new(RoomService::new(RoomServiceDependencies {
            room_repository: rooms.clone(),
            user_repository: users.clone(),
            clock: clock.clone(),
        }));
        let messages = Arc::new(MessageService::new(MessageServiceDependencies {
            message_repository: Arc::new(InMemoryMessageRepository::new()),
            room_repository: rooms.clone(),
            clock: clock.clone(),
        }));

        Self {
            clock,
            hasher,
            users,
            rooms,
            credentials,
            profiles,
            room_service,
            messages,
        }
    }
}

pub fn register_request(email: &str, name: &str, country: &str, city: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "secret-pass".to_string(),
        name: name.to_string(),
        age: 29,
        gender: Gender::Female,
        profile_pic: None,
        country: country.to_string(),
        city: city.to_string(),
        travel_start: start_time() + Duration::days(10),
        travel_end: start_time() + Duration::days(17),
        bio: "Ramen hunter".to_string(),
        travel_purpose: TravelPurpose::FoodTour,
        travel_budget: 1500,
        travel_style: TravelStyle::Spontaneous,
    }
}
