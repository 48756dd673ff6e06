//! 用例的输入输出结构
//!
//! 两个传输面共享这些结构，JSON 字段名与对外接口一致。

use domain::{
    ActivityStatus, ChatRoom, DestinationKey, Gender, MessageType, RoomId, RoomType, Timestamp,
    TravelPurpose, TravelStyle, User, UserId,
};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::credential::TokenPair;

pub const TOKEN_TYPE_BEARER: &str = "Bearer";
pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[validate(length(min = 2))]
    pub name: String,
    #[validate(range(min = 18, max = 100))]
    pub age: i32,
    pub gender: Gender,
    #[serde(default)]
    pub profile_pic: Option<String>,
    pub country: String,
    pub city: String,
    pub travel_start: Timestamp,
    pub travel_end: Timestamp,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub bio: String,
    pub travel_purpose: TravelPurpose,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub travel_budget: i32,
    pub travel_style: TravelStyle,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// 对外的用户资料，不含密码哈希
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub profile_pic: String,
    pub country: String,
    pub city: String,
    pub destination: DestinationKey,
    pub travel_start: Timestamp,
    pub travel_end: Timestamp,
    pub bio: String,
    pub travel_purpose: TravelPurpose,
    pub travel_budget: i32,
    pub travel_style: TravelStyle,
    pub activity_status: ActivityStatus,
    pub last_active: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserProfile {
    pub fn from_user(user: &User, now: Timestamp) -> Self {
        Self {
            id: user.id,
            email: user.email.as_str().to_owned(),
            name: user.name.clone(),
            age: user.age,
            gender: user.gender,
            profile_pic: user.profile_pic.clone(),
            country: user.country.clone(),
            city: user.city.clone(),
            destination: user.destination(),
            travel_start: user.travel_start,
            travel_end: user.travel_end,
            bio: user.bio.clone(),
            travel_purpose: user.travel_purpose,
            travel_budget: user.travel_budget,
            travel_style: user.travel_style,
            activity_status: user.activity_status(now),
            last_active: user.last_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: TOKEN_TYPE_BEARER,
            expires_in: pair.expires_in,
        }
    }
}

/// 部分更新中的单个字段：缺省表示不变，`null` 表示清空
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    #[default]
    Unchanged,
    Set(T),
    Clear,
}

impl<T> FieldUpdate<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FieldUpdate::Unchanged)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: FieldUpdate<String>,
    pub age: FieldUpdate<i32>,
    pub gender: FieldUpdate<Gender>,
    pub profile_pic: FieldUpdate<String>,
    pub country: FieldUpdate<String>,
    pub city: FieldUpdate<String>,
    pub travel_start: FieldUpdate<Timestamp>,
    pub travel_end: FieldUpdate<Timestamp>,
    pub bio: FieldUpdate<String>,
    pub travel_purpose: FieldUpdate<TravelPurpose>,
    pub travel_budget: FieldUpdate<i32>,
    pub travel_style: FieldUpdate<TravelStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl ListUsersQuery {
    /// 页码默认 1；每页默认 10 条，最多 100 条
    pub fn normalized(&self) -> (i64, i64) {
        let page = self.page.filter(|page| *page > 0).unwrap_or(1);
        let limit = self
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .min(MAX_PAGE_LIMIT);
        (page, limit)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<UserProfile>,
    pub page: i64,
    pub limit: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublicRoomRequest {
    pub country: String,
    pub city: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairTravelersRequest {
    pub peer_id: UserId,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub id: RoomId,
    pub name: String,
    pub room_type: RoomType,
    pub country: String,
    pub city: String,
    pub room_key: DestinationKey,
    pub created_at: Timestamp,
}

impl From<&ChatRoom> for RoomView {
    fn from(room: &ChatRoom) -> Self {
        Self {
            id: room.id,
            name: room.name.clone(),
            room_type: room.room_type,
            country: room.country.clone(),
            city: room.city.clone(),
            room_key: room.room_key(),
            created_at: room.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
    #[serde(default)]
    pub message_type: Option<MessageType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMessagesQuery {
    pub limit: Option<i64>,
}
