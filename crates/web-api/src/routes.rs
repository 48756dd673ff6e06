use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use application::dto::{
    ListMessagesQuery, ListUsersQuery, LoginRequest, LoginResponse, PairTravelersRequest,
    PostMessageRequest, PublicRoomRequest, RefreshRequest, RegisterRequest, RoomView,
    TokenResponse, UpdateProfileRequest, UserPage, UserProfile,
};
use domain::{Message, RoomId, UserId};

use crate::{auth::authenticate, error::ApiError, state::AppState};

type JsonBody<T> = Result<Json<T>, JsonRejection>;

pub fn router(state: AppState) -> Router {
    let timeout = state.request_timeout;
    Router::new()
        .nest("/api", api_routes())
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route(
            "/users/destination/{country}/{city}",
            get(users_by_destination),
        )
        .route(
            "/users/{id}",
            get(get_profile).put(update_profile).delete(delete_user),
        )
        .route("/users/{id}/activity", post(touch_last_active))
        .route("/rooms/public", post(public_room))
        .route("/rooms/private", post(private_room))
        .route("/rooms/{id}", get(get_room))
        .route(
            "/rooms/{id}/messages",
            post(post_message).get(list_messages),
        )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "travel-chat" }))
}

async fn register(
    State(state): State<AppState>,
    payload: JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let Json(payload) = payload?;
    let profile = state.profiles.register(payload).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn login(
    State(state): State<AppState>,
    payload: JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;
    Ok(Json(state.profiles.login(payload).await?))
}

async fn refresh(
    State(state): State<AppState>,
    payload: JsonBody<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(payload) = payload?;
    Ok(Json(state.profiles.refresh_session(payload).await?))
}

async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<UserPage>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.profiles.list_users(query).await?))
}

async fn users_by_destination(
    State(state): State<AppState>,
    Path((country, city)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let users = state.profiles.users_by_destination(&country, &city).await?;
    Ok(Json(json!({ "users": users, "count": users.len() })))
}

async fn get_profile(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserProfile>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.profiles.get_profile(UserId(id)).await?))
}

async fn get_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, ApiError> {
    let identity = authenticate(&headers, &state.credentials)?;
    Ok(Json(state.profiles.get_me(&identity).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
    payload: JsonBody<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let identity = authenticate(&headers, &state.credentials)?;
    let Path(id) = id?;
    let Json(patch) = payload?;
    let profile = state
        .profiles
        .update_profile(identity.user_id, UserId(id), patch)
        .await?;
    Ok(Json(profile))
}

async fn touch_last_active(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let identity = authenticate(&headers, &state.credentials)?;
    let Path(id) = id?;
    state
        .profiles
        .touch_last_active(identity.user_id, UserId(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let identity = authenticate(&headers, &state.credentials)?;
    let Path(id) = id?;
    state
        .profiles
        .delete_user(identity.user_id, UserId(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn public_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: JsonBody<PublicRoomRequest>,
) -> Result<Json<RoomView>, ApiError> {
    authenticate(&headers, &state.credentials)?;
    let Json(payload) = payload?;
    let room = state
        .rooms
        .get_or_create_public_room(&payload.country, &payload.city)
        .await?;
    Ok(Json(RoomView::from(&room)))
}

async fn private_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: JsonBody<PairTravelersRequest>,
) -> Result<(StatusCode, Json<RoomView>), ApiError> {
    let identity = authenticate(&headers, &state.credentials)?;
    let Json(payload) = payload?;
    let room = state
        .rooms
        .pair_travelers(identity.user_id, payload.peer_id)
        .await?;
    Ok((StatusCode::CREATED, Json(RoomView::from(&room))))
}

async fn get_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<RoomView>, ApiError> {
    authenticate(&headers, &state.credentials)?;
    let Path(id) = id?;
    let room = state.rooms.find_room(RoomId(id)).await?;
    Ok(Json(RoomView::from(&room)))
}

async fn post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
    payload: JsonBody<PostMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let identity = authenticate(&headers, &state.credentials)?;
    let Path(id) = id?;
    let Json(payload) = payload?;
    let message = state
        .messages
        .post_request(identity.user_id, RoomId(id), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<ListMessagesQuery>, QueryRejection>,
) -> Result<Json<Vec<Message>>, ApiError> {
    authenticate(&headers, &state.credentials)?;
    let Path(id) = id?;
    let Query(query) = query?;
    let messages = state.messages.list_messages(RoomId(id), query.limit).await?;
    Ok(Json(messages))
}
