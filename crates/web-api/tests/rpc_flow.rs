mod support;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use support::{build_app, registration, send};
use web_api::{CHAT_SERVICE, USER_SERVICE};

async fn call(
    app: &axum::Router,
    service: &str,
    method: &str,
    token: Option<&str>,
    body: Value,
) -> Value {
    let (status, reply) = send(
        app,
        Method::POST,
        &format!("/rpc/{service}/{method}"),
        token,
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    reply
}

#[tokio::test]
async fn user_service_round_trip() {
    let app = build_app();

    let registered = call(
        &app.rpc,
        USER_SERVICE,
        "Register",
        None,
        registration("ana@example.com", "Ana", "Peru", "Lima"),
    )
    .await;
    assert_eq!(registered["code"], "OK");
    let id = registered["data"]["id"].as_i64().unwrap();

    let login = call(
        &app.rpc,
        USER_SERVICE,
        "Login",
        None,
        json!({ "email": "ana@example.com", "password": "secret-pass" }),
    )
    .await;
    assert_eq!(login["code"], "OK");
    let token = login["data"]["access_token"].as_str().unwrap().to_string();

    let me = call(&app.rpc, USER_SERVICE, "GetMyProfile", Some(&token), json!({})).await;
    assert_eq!(me["data"]["id"], id);

    let profile = call(&app.rpc, USER_SERVICE, "GetProfile", None, json!({ "user_id": id })).await;
    assert_eq!(profile["data"]["name"], "Ana");

    let updated = call(
        &app.rpc,
        USER_SERVICE,
        "UpdateProfile",
        Some(&token),
        json!({ "user_id": id, "name": "Ana Maria" }),
    )
    .await;
    assert_eq!(updated["code"], "OK");
    assert_eq!(updated["data"]["name"], "Ana Maria");
    assert_eq!(updated["data"]["city"], "Lima");

    let by_destination = call(
        &app.rpc,
        USER_SERVICE,
        "GetUsersByDestination",
        None,
        json!({ "country": "Peru", "city": "Lima" }),
    )
    .await;
    assert_eq!(by_destination["data"]["users"].as_array().unwrap().len(), 1);

    let page = call(&app.rpc, USER_SERVICE, "GetUsers", None, json!({})).await;
    assert_eq!(page["data"]["total_count"], 1);

    let rotated = call(
        &app.rpc,
        USER_SERVICE,
        "RefreshToken",
        None,
        json!({ "refresh_token": login["data"]["refresh_token"] }),
    )
    .await;
    assert_eq!(rotated["code"], "OK");
}

#[tokio::test]
async fn failures_use_rpc_status_codes() {
    let app = build_app();
    call(
        &app.rpc,
        USER_SERVICE,
        "Register",
        None,
        registration("leo@example.com", "Leo", "Peru", "Cusco"),
    )
    .await;

    let duplicate = call(
        &app.rpc,
        USER_SERVICE,
        "Register",
        None,
        registration("leo@example.com", "Leo", "Peru", "Cusco"),
    )
    .await;
    assert_eq!(duplicate["code"], "ALREADY_EXISTS");
    assert!(duplicate.get("data").is_none());

    let bad_login = call(
        &app.rpc,
        USER_SERVICE,
        "Login",
        None,
        json!({ "email": "leo@example.com", "password": "wrong-one" }),
    )
    .await;
    assert_eq!(bad_login["code"], "UNAUTHENTICATED");

    let anonymous = call(&app.rpc, USER_SERVICE, "GetMyProfile", None, json!({})).await;
    assert_eq!(anonymous["code"], "UNAUTHENTICATED");

    let missing = call(&app.rpc, USER_SERVICE, "GetProfile", None, json!({ "user_id": 404 })).await;
    assert_eq!(missing["code"], "NOT_FOUND");

    let malformed = call(&app.rpc, USER_SERVICE, "GetProfile", None, json!({ "user_id": "x" })).await;
    assert_eq!(malformed["code"], "INVALID_ARGUMENT");

    let unknown = call(&app.rpc, USER_SERVICE, "Teleport", None, json!({})).await;
    assert_eq!(unknown["code"], "UNIMPLEMENTED");
}

#[tokio::test]
async fn chat_service_resolves_rooms_and_messages() {
    let app = build_app();
    for (email, name) in [("ana@example.com", "Ana"), ("luis@example.com", "Luis")] {
        call(
            &app.rpc,
            USER_SERVICE,
            "Register",
            None,
            registration(email, name, "Peru", "Cusco"),
        )
        .await;
    }
    let login = call(
        &app.rpc,
        USER_SERVICE,
        "Login",
        None,
        json!({ "email": "ana@example.com", "password": "secret-pass" }),
    )
    .await;
    let token = login["data"]["access_token"].as_str().unwrap().to_string();

    let public = call(
        &app.rpc,
        CHAT_SERVICE,
        "GetOrCreatePublicRoom",
        Some(&token),
        json!({ "country": "Peru", "city": "Cusco" }),
    )
    .await;
    assert_eq!(public["code"], "OK");
    assert_eq!(public["data"]["room_key"], "Peru-Cusco");
    let room_id = public["data"]["id"].clone();

    let same = call(
        &app.rpc,
        CHAT_SERVICE,
        "GetOrCreatePublicRoom",
        Some(&token),
        json!({ "country": "Peru", "city": "Cusco" }),
    )
    .await;
    assert_eq!(same["data"]["id"], room_id);

    let posted = call(
        &app.rpc,
        CHAT_SERVICE,
        "PostMessage",
        Some(&token),
        json!({ "room_id": room_id, "content": "Machu Picchu tomorrow", "message_type": "text" }),
    )
    .await;
    assert_eq!(posted["code"], "OK");

    let listed = call(
        &app.rpc,
        CHAT_SERVICE,
        "ListMessages",
        Some(&token),
        json!({ "room_id": room_id }),
    )
    .await;
    assert_eq!(listed["data"]["messages"].as_array().unwrap().len(), 1);

    let peer_id = login["data"]["user"]["id"].as_i64().unwrap() + 1;
    let paired = call(
        &app.rpc,
        CHAT_SERVICE,
        "PairTravelers",
        Some(&token),
        json!({ "peer_id": peer_id }),
    )
    .await;
    assert_eq!(paired["data"]["name"], "Ana & Luis");

    let empty = call(
        &app.rpc,
        CHAT_SERVICE,
        "PostMessage",
        Some(&token),
        json!({ "room_id": room_id, "content": "" }),
    )
    .await;
    assert_eq!(empty["code"], "INVALID_ARGUMENT");

    let no_destination = call(
        &app.rpc,
        CHAT_SERVICE,
        "GetOrCreatePublicRoom",
        Some(&token),
        json!({ "country": "", "city": "Cusco" }),
    )
    .await;
    assert_eq!(no_destination["code"], "INVALID_ARGUMENT");
}
