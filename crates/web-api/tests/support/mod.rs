#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use application::{
    memory::{InMemoryChatRoomRepository, InMemoryMessageRepository, InMemoryUserRepository},
    CredentialService, CredentialSettings, ManualClock, MessageService,
    MessageServiceDependencies, PasswordHasher, PasswordHasherError, ProfileService,
    ProfileServiceDependencies, RoomService, RoomServiceDependencies,
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use domain::{PasswordHash, Timestamp};
use serde_json::{json, Value};
use tower::ServiceExt;
use web_api::{router, rpc_router, AppState};

/// 测试用的假哈希，避免 bcrypt 的开销
#[derive(Default)]
pub struct PlainHasher;

#[async_trait]
impl PasswordHasher for PlainHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        PasswordHash::new(format!("plain${plaintext}"))
            .map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        Ok(hashed.as_str() == format!("plain${plaintext}"))
    }
}

pub fn start_time() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
}

pub struct TestApp {
    pub clock: Arc<ManualClock>,
    pub rest: Router,
    pub rpc: Router,
}

pub fn build_app() -> TestApp {
    let clock = Arc::new(ManualClock::new(start_time()));
    let users = Arc::new(InMemoryUserRepository::new());
    let rooms = Arc::new(InMemoryChatRoomRepository::new());
    let credentials = Arc::new(CredentialService::new(
        CredentialSettings {
            secret: "web-api-test-secret-with-plenty-of-bytes".to_string(),
            issuer: "travel-chat".to_string(),
            access_ttl: chrono::Duration::hours(24),
            refresh_ttl: chrono::Duration::days(7),
        },
        clock.clone(),
    ));

    let profiles = Arc::new(ProfileService::new(ProfileServiceDependencies {
        user_repository: users.clone(),
        password_hasher: Arc::new(PlainHasher),
        credentials: credentials.clone(),
        clock: clock.clone(),
    }));
    let room_service = Arc::new(RoomService::new(RoomServiceDependencies {
        room_repository: rooms.clone(),
        user_repository: users,
        clock: clock.clone(),
    }));
    let messages = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository: Arc::new(InMemoryMessageRepository::new()),
        room_repository: rooms,
        clock: clock.clone(),
    }));

    let state = AppState::new(
        profiles,
        room_service,
        messages,
        credentials,
        Duration::from_secs(5),
    );

    TestApp {
        clock,
        rest: router(state.clone()),
        rpc: rpc_router(state),
    }
}

pub fn registration(email: &str, name: &str, country: &str, city: &str) -> Value {
    json!({
        "email": email,
        "password": "secret-pass",
        "name": name,
        "age": 27,
        "gender": "male",
        "country": country,
        "city": city,
        "travel_start": "2026-04-01T00:00:00Z",
        "travel_end": "2026-04-10T00:00:00Z",
        "bio": "street food and night walks",
        "travel_purpose": "tourism",
        "travel_budget": 900,
        "travel_style": "budget"
    })
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// 注册并登录，返回用户 id 和访问令牌
pub async fn sign_up(app: &Router, email: &str, name: &str, country: &str, city: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(registration(email, name, country, city)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, login) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "secret-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{login}");

    (
        body["id"].as_i64().unwrap(),
        login["access_token"].as_str().unwrap().to_string(),
    )
}
