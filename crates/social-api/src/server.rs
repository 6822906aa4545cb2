//! Axum server and routes.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use social_core::{SharedService, UserService};
use social_types::{
    CommandResult, ErrorCode, FriendshipStateData, Notification, PublicProfile, ServiceError,
    UserId,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Header carrying the authenticated caller's id, set by the gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

pub struct AppState {
    pub service: SharedService,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/user", get(handle_me).delete(handle_delete_me))
        .route("/user/username", put(handle_edit_username))
        .route("/user/notifications", get(handle_notifications))
        .route("/user/friends", get(handle_friends))
        .route("/user/friends/requests", get(handle_incoming))
        .route("/user/friends/requests/outgoing", get(handle_outgoing))
        .route(
            "/user/friends/requests/outgoing/:username",
            post(handle_request).delete(handle_cancel),
        )
        .route(
            "/user/friends/requests/:username",
            put(handle_accept).delete(handle_refuse),
        )
        .route("/user/friends/state/:username", get(handle_state))
        .route("/user/friends/:username", delete(handle_remove_friend))
        .route("/user/:username", get(handle_user))
        .route("/internal/users", post(handle_initialize))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler failure, rendered with the matching status code.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    /// Command refused; the body is the list of error codes.
    Rejected(Vec<ErrorCode>),
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "missing or invalid x-user-id header" })),
            )
                .into_response(),
            ApiError::Rejected(errors) => (StatusCode::NOT_FOUND, Json(errors)).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": msg })),
                )
                    .into_response()
            }
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn caller_id(headers: &HeaderMap) -> ApiResult<UserId> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .ok_or(ApiError::Unauthorized)
}

/// Identify the caller and run the on-seen hook.
async fn seen(service: &mut UserService, headers: &HeaderMap) -> ApiResult<UserId> {
    let id = caller_id(headers)?;
    service.on_user_seen(id).await?;
    Ok(id)
}

/// A path segment with a letter is a username, anything else a numeric id.
async fn resolve_target(service: &mut UserService, raw: &str) -> ApiResult<UserId> {
    if raw.chars().any(|c| c.is_ascii_alphabetic()) {
        let result = service.resolve_user_id(raw).await?;
        return data_or_reject(result);
    }
    raw.parse()
        .map_err(|_| ApiError::Rejected(vec![ErrorCode::UndefinedUser]))
}

fn data_or_reject<T>(result: CommandResult<T>) -> ApiResult<T> {
    match (result.success, result.data) {
        (true, Some(data)) => Ok(data),
        _ => Err(ApiError::Rejected(result.errors)),
    }
}

fn json_or_reject<T: Serialize>(result: CommandResult<T>) -> ApiResult<Json<T>> {
    data_or_reject(result).map(Json)
}

fn no_content(result: CommandResult) -> ApiResult<StatusCode> {
    if result.success {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::Rejected(result.errors))
    }
}

async fn handle_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<PublicProfile>> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    json_or_reject(service.get_user_data(me).await?)
}

async fn handle_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> ApiResult<Json<PublicProfile>> {
    let mut service = state.service.lock().await;
    seen(&mut service, &headers).await?;
    let target = resolve_target(&mut service, &username).await?;
    json_or_reject(service.get_user_data(target).await?)
}

#[derive(Debug, Deserialize)]
pub struct EditUsernameBody {
    pub username: String,
}

async fn handle_edit_username(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<EditUsernameBody>,
) -> ApiResult<StatusCode> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    no_content(service.edit_username(me, &body.username).await?)
}

async fn handle_delete_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    no_content(service.remove_user(me).await?)
}

async fn handle_friends(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<PublicProfile>>> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    json_or_reject(service.get_friends(me).await?)
}

async fn handle_incoming(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<PublicProfile>>> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    json_or_reject(service.get_incoming_requests(me).await?)
}

async fn handle_outgoing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<PublicProfile>>> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    json_or_reject(service.get_outgoing_requests(me).await?)
}

async fn handle_state(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> ApiResult<Json<FriendshipStateData>> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    let other = resolve_target(&mut service, &username).await?;
    json_or_reject(service.get_friendship_state(me, other))
}

async fn handle_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    let target = resolve_target(&mut service, &username).await?;
    no_content(service.request_friend(me, target).await?)
}

async fn handle_cancel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    let target = resolve_target(&mut service, &username).await?;
    no_content(service.cancel_friend_request(me, target).await?)
}

async fn handle_accept(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    let sender = resolve_target(&mut service, &username).await?;
    no_content(service.accept_friend_request(me, sender).await?)
}

async fn handle_refuse(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    let sender = resolve_target(&mut service, &username).await?;
    no_content(service.refuse_friend_request(me, sender).await?)
}

async fn handle_remove_friend(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    let friend = resolve_target(&mut service, &username).await?;
    no_content(service.remove_friend(me, friend).await?)
}

async fn handle_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Notification>>> {
    let mut service = state.service.lock().await;
    let me = seen(&mut service, &headers).await?;
    Ok(Json(service.fetch_notifications(me).await))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeUserBody {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Called by the auth service when an account is registered.
async fn handle_initialize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InitializeUserBody>,
) -> ApiResult<StatusCode> {
    let mut service = state.service.lock().await;
    let result = service
        .initialize_user(body.id, &body.username, body.avatar_url)
        .await?;
    if result.success {
        Ok(StatusCode::CREATED)
    } else {
        Err(ApiError::Rejected(result.errors))
    }
}

async fn handle_health() -> &'static str {
    "ok"
}
