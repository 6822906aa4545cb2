//! Integration tests: identity, friend requests end to end, username edits, account removal.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use social_api::server::{self, AppState, USER_ID_HEADER};
use social_core::{FsAvatarStore, InMemoryNotifier, ServiceConfig, UserService};
use social_store::InMemoryStore;
use std::sync::Arc;
use tower::util::ServiceExt;

fn test_app() -> axum::Router {
    let service = UserService::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryNotifier::new()),
        Arc::new(FsAvatarStore::new(
            std::env::temp_dir().join("social-api-test-avatars"),
        )),
        &ServiceConfig::default(),
    )
    .into_shared();
    server::router(Arc::new(AppState { service }))
}

fn request(method: &str, uri: &str, user: Option<i64>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        builder = builder.header(USER_ID_HEADER, id.to_string());
    }
    match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<i64>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let res = app
        .clone()
        .oneshot(request(method, uri, user, body))
        .await
        .unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

async fn register(app: &axum::Router, id: i64, username: &str) {
    let (status, _) = send(
        app,
        "POST",
        "/internal/users",
        None,
        Some(json!({ "id": id, "username": username })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn health_is_open() {
    let app = test_app();
    let res = app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let app = test_app();
    let (status, _) = send(&app, "GET", "/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "GET", "/user/friends", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn first_visit_creates_a_default_profile() {
    let app = test_app();
    let (status, me) = send(&app, "GET", "/user", Some(5), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], 5);
    assert!(me["username"].as_str().unwrap().contains('_'));
    assert_eq!(me["avatarUrl"], "/api/v1/user/avatars/default.webp");
}

#[tokio::test]
async fn friend_request_flow_by_username() {
    let app = test_app();
    register(&app, 1, "alice").await;
    register(&app, 2, "bob").await;

    let (status, _) = send(&app, "POST", "/user/friends/requests/outgoing/bob", Some(1), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, errors) =
        send(&app, "POST", "/user/friends/requests/outgoing/bob", Some(1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(errors, json!(["AlreadyRequested"]));

    let (_, incoming) = send(&app, "GET", "/user/friends/requests", Some(2), None).await;
    assert_eq!(incoming[0]["username"], "alice");
    let (_, state) = send(&app, "GET", "/user/friends/state/alice", Some(2), None).await;
    assert_eq!(state, json!({ "state": "incoming" }));

    let (_, notes) = send(&app, "GET", "/user/notifications", Some(2), None).await;
    assert_eq!(notes[0]["type"], "FRIENDREQUEST_RECEIVED");
    assert_eq!(notes[0]["data"]["from"], "alice");

    let (status, _) = send(&app, "PUT", "/user/friends/requests/alice", Some(2), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, friends) = send(&app, "GET", "/user/friends", Some(1), None).await;
    assert_eq!(friends.as_array().unwrap().len(), 1);
    assert_eq!(friends[0]["username"], "bob");

    // Numeric ids work as path parameters too.
    let (status, _) = send(&app, "DELETE", "/user/friends/2", Some(1), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, friends) = send(&app, "GET", "/user/friends", Some(2), None).await;
    assert_eq!(friends, json!([]));
    let (status, errors) = send(&app, "GET", "/user/friends/state/bob", Some(1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(errors, json!([]));
}

#[tokio::test]
async fn cancel_and_refuse() {
    let app = test_app();
    register(&app, 1, "alice").await;
    register(&app, 2, "bob").await;
    register(&app, 3, "carol").await;

    send(&app, "POST", "/user/friends/requests/outgoing/bob", Some(1), None).await;
    let (status, _) = send(&app, "DELETE", "/user/friends/requests/outgoing/bob", Some(1), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, outgoing) = send(&app, "GET", "/user/friends/requests/outgoing", Some(1), None).await;
    assert_eq!(outgoing, json!([]));

    send(&app, "POST", "/user/friends/requests/outgoing/alice", Some(3), None).await;
    let (status, _) = send(&app, "DELETE", "/user/friends/requests/carol", Some(1), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, errors) = send(&app, "DELETE", "/user/friends/requests/carol", Some(1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(errors, json!(["UndefinedRequest"]));
}

#[tokio::test]
async fn unknown_usernames_are_not_found() {
    let app = test_app();
    register(&app, 1, "alice").await;
    let (status, errors) =
        send(&app, "POST", "/user/friends/requests/outgoing/nobody", Some(1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(errors, json!(["UndefinedUser"]));

    let (status, errors) = send(&app, "GET", "/user/ghost", Some(1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(errors, json!(["UndefinedUser"]));
}

#[tokio::test]
async fn username_edits_are_validated() {
    let app = test_app();
    register(&app, 1, "alice").await;
    register(&app, 2, "bob").await;

    let (status, errors) = send(
        &app,
        "PUT",
        "/user/username",
        Some(1),
        Some(json!({ "username": "12" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(errors, json!(["TOO_SHORT", "MUST_CONTAIN_LETTERS"]));

    let (_, errors) = send(&app, "PUT", "/user/username", Some(1), Some(json!({ "username": "bob" }))).await;
    assert_eq!(errors, json!(["ALREADY_TAKEN"]));

    let (status, _) = send(
        &app,
        "PUT",
        "/user/username",
        Some(1),
        Some(json!({ "username": "alicia" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, profile) = send(&app, "GET", "/user/alicia", Some(2), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["id"], 1);
}

#[tokio::test]
async fn duplicate_initialize_is_rejected() {
    let app = test_app();
    register(&app, 1, "alice").await;
    let (status, errors) = send(
        &app,
        "POST",
        "/internal/users",
        None,
        Some(json!({ "id": 1, "username": "again" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(errors, json!(["USER_ALREADY_EXISTS"]));
}

#[tokio::test]
async fn deleting_an_account_clears_friendships() {
    let app = test_app();
    register(&app, 1, "alice").await;
    register(&app, 2, "bob").await;
    send(&app, "POST", "/user/friends/requests/outgoing/bob", Some(1), None).await;
    send(&app, "PUT", "/user/friends/requests/alice", Some(2), None).await;

    let (status, _) = send(&app, "DELETE", "/user", Some(1), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, friends) = send(&app, "GET", "/user/friends", Some(2), None).await;
    assert_eq!(friends, json!([]));
    let (status, _) = send(&app, "GET", "/user/alice", Some(2), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
