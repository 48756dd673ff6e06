//! 一元 JSON RPC 入口
//!
//! 所有调用都走 `POST /rpc/{service}/{method}`，请求体是方法参数，响应统一为
//! `{ "code", "message", "data" }`。HTTP 状态码始终为 200，调用结果只看 `code`。

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use application::{
    dto::{
        ListUsersQuery, LoginRequest, PairTravelersRequest, PostMessageRequest, PublicRoomRequest,
        RefreshRequest, RegisterRequest, RoomView, UpdateProfileRequest,
    },
    ApplicationError, Identity,
};
use domain::{MessageType, RepositoryError, RoomId, UserId};

use crate::{auth::authenticate, state::AppState};

pub const USER_SERVICE: &str = "travelchat.UserService";
pub const CHAT_SERVICE: &str = "travelchat.ChatService";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcCode {
    Ok,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    Unimplemented,
    Internal,
    Unauthenticated,
}

#[derive(Debug)]
pub struct RpcStatus {
    pub code: RpcCode,
    pub message: String,
}

impl RpcStatus {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ApplicationError> for RpcStatus {
    fn from(error: ApplicationError) -> Self {
        use ApplicationError as AppErr;

        let code = match &error {
            AppErr::InvalidCredential | AppErr::InvalidCredentials => RpcCode::Unauthenticated,
            AppErr::NotFound(_) | AppErr::Storage(RepositoryError::NotFound) => RpcCode::NotFound,
            AppErr::EmailAlreadyExists | AppErr::Storage(RepositoryError::Conflict) => {
                RpcCode::AlreadyExists
            }
            AppErr::Forbidden => RpcCode::PermissionDenied,
            AppErr::Validation(_) => RpcCode::InvalidArgument,
            AppErr::Storage(RepositoryError::Timeout) => RpcCode::DeadlineExceeded,
            AppErr::Storage(_) | AppErr::Password(_) | AppErr::Internal(_) => {
                tracing::error!(error = %error, "rpc call failed");
                return RpcStatus::new(RpcCode::Internal, "internal error");
            }
        };
        RpcStatus::new(code, error.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct RpcReply {
    pub code: RpcCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcReply {
    fn ok(data: Value) -> Self {
        Self {
            code: RpcCode::Ok,
            message: "OK".to_string(),
            data: Some(data),
        }
    }

    fn error(status: RpcStatus) -> Self {
        Self {
            code: status.code,
            message: status.message,
            data: None,
        }
    }
}

pub fn rpc_router(state: AppState) -> Router {
    Router::new()
        .route("/rpc/{service}/{method}", post(dispatch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn dispatch(
    State(state): State<AppState>,
    Path((service, method)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<RpcReply> {
    let deadline = state.request_timeout;
    let call = invoke(&state, &service, &method, &headers, &body);

    let reply = match tokio::time::timeout(deadline, call).await {
        Ok(Ok(data)) => RpcReply::ok(data),
        Ok(Err(status)) => {
            tracing::debug!(%service, %method, code = ?status.code, "rpc call rejected");
            RpcReply::error(status)
        }
        Err(_) => {
            tracing::warn!(%service, %method, "rpc call exceeded deadline");
            RpcReply::error(RpcStatus::new(RpcCode::DeadlineExceeded, "deadline exceeded"))
        }
    };
    Json(reply)
}

#[derive(Debug, Deserialize)]
struct UserIdRequest {
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct DestinationRequest {
    country: String,
    city: String,
}

#[derive(Debug, Deserialize)]
struct UpdateProfileCall {
    user_id: UserId,
    #[serde(flatten)]
    patch: UpdateProfileRequest,
}

#[derive(Debug, Deserialize)]
struct PostMessageCall {
    room_id: RoomId,
    content: String,
    #[serde(default)]
    message_type: Option<MessageType>,
}

#[derive(Debug, Deserialize)]
struct ListMessagesCall {
    room_id: RoomId,
    #[serde(default)]
    limit: Option<i64>,
}

async fn invoke(
    state: &AppState,
    service: &str,
    method: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Value, RpcStatus> {
    let auth = || authenticate(headers, &state.credentials).map_err(RpcStatus::from);

    match (service, method) {
        (USER_SERVICE, "Register") => {
            let request: RegisterRequest = decode(body)?;
            reply(state.profiles.register(request).await)
        }
        (USER_SERVICE, "Login") => {
            let request: LoginRequest = decode(body)?;
            reply(state.profiles.login(request).await)
        }
        (USER_SERVICE, "RefreshToken") => {
            let request: RefreshRequest = decode(body)?;
            reply(state.profiles.refresh_session(request).await)
        }
        (USER_SERVICE, "GetProfile") => {
            let request: UserIdRequest = decode(body)?;
            reply(state.profiles.get_profile(request.user_id).await)
        }
        (USER_SERVICE, "GetMyProfile") => {
            let identity: Identity = auth()?;
            reply(state.profiles.get_me(&identity).await)
        }
        (USER_SERVICE, "GetUsers") => {
            let request: ListUsersQuery = decode(body)?;
            reply(state.profiles.list_users(request).await)
        }
        (USER_SERVICE, "GetUsersByDestination") => {
            let request: DestinationRequest = decode(body)?;
            let users = state
                .profiles
                .users_by_destination(&request.country, &request.city)
                .await
                .map_err(RpcStatus::from)?;
            encode(&serde_json::json!({ "users": users }))
        }
        (USER_SERVICE, "UpdateProfile") => {
            let identity = auth()?;
            let request: UpdateProfileCall = decode(body)?;
            reply(
                state
                    .profiles
                    .update_profile(identity.user_id, request.user_id, request.patch)
                    .await,
            )
        }
        (CHAT_SERVICE, "GetOrCreatePublicRoom") => {
            auth()?;
            let request: PublicRoomRequest = decode(body)?;
            let room = state
                .rooms
                .get_or_create_public_room(&request.country, &request.city)
                .await
                .map_err(RpcStatus::from)?;
            encode(&RoomView::from(&room))
        }
        (CHAT_SERVICE, "PairTravelers") => {
            let identity = auth()?;
            let request: PairTravelersRequest = decode(body)?;
            let room = state
                .rooms
                .pair_travelers(identity.user_id, request.peer_id)
                .await
                .map_err(RpcStatus::from)?;
            encode(&RoomView::from(&room))
        }
        (CHAT_SERVICE, "PostMessage") => {
            let identity = auth()?;
            let request: PostMessageCall = decode(body)?;
            let post = PostMessageRequest {
                content: request.content,
                message_type: request.message_type,
            };
            reply(
                state
                    .messages
                    .post_request(identity.user_id, request.room_id, post)
                    .await,
            )
        }
        (CHAT_SERVICE, "ListMessages") => {
            auth()?;
            let request: ListMessagesCall = decode(body)?;
            let messages = state
                .messages
                .list_messages(request.room_id, request.limit)
                .await
                .map_err(RpcStatus::from)?;
            encode(&serde_json::json!({ "messages": messages }))
        }
        _ => Err(RpcStatus::new(
            RpcCode::Unimplemented,
            format!("unknown method {service}/{method}"),
        )),
    }
}

/// 空请求体按空对象处理
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, RpcStatus> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body)
        .map_err(|err| RpcStatus::new(RpcCode::InvalidArgument, err.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, RpcStatus> {
    serde_json::to_value(value).map_err(|err| {
        tracing::error!(error = %err, "failed to encode rpc reply");
        RpcStatus::new(RpcCode::Internal, "internal error")
    })
}

fn reply<T: Serialize>(result: Result<T, ApplicationError>) -> Result<Value, RpcStatus> {
    encode(&result.map_err(RpcStatus::from)?)
}

#[cfg(test)]
mod tests {
    use domain::DomainError;

    use super::*;

    #[test]
    fn application_errors_map_to_rpc_codes() {
        let cases = [
            (ApplicationError::InvalidCredential, RpcCode::Unauthenticated),
            (ApplicationError::InvalidCredentials, RpcCode::Unauthenticated),
            (ApplicationError::NotFound("room"), RpcCode::NotFound),
            (ApplicationError::EmailAlreadyExists, RpcCode::AlreadyExists),
            (ApplicationError::Forbidden, RpcCode::PermissionDenied),
            (
                ApplicationError::Validation(DomainError::InvalidDestination),
                RpcCode::InvalidArgument,
            ),
            (
                ApplicationError::Storage(RepositoryError::Timeout),
                RpcCode::DeadlineExceeded,
            ),
            (
                ApplicationError::internal("boom"),
                RpcCode::Internal,
            ),
        ];
        for (error, code) in cases {
            assert_eq!(RpcStatus::from(error).code, code);
        }
    }

    #[test]
    fn codes_serialize_in_screaming_case() {
        assert_eq!(
            serde_json::to_value(RpcCode::InvalidArgument).unwrap(),
            serde_json::json!("INVALID_ARGUMENT")
        );
        assert_eq!(
            serde_json::to_value(RpcCode::Ok).unwrap(),
            serde_json::json!("OK")
        );
    }

    #[test]
    fn blank_body_decodes_as_empty_object() {
        let query: ListUsersQuery = decode(b"  ").unwrap();
        assert!(query.page.is_none());
        assert!(matches!(
            decode::<UserIdRequest>(b"{}"),
            Err(RpcStatus {
                code: RpcCode::InvalidArgument,
                ..
            })
        ));
    }
}
