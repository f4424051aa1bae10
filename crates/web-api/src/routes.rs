use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use application::{CredentialVerifier, MessageStore, UserDirectory};
use domain::{Message, StandingRecord, SubjectId};

use crate::{error::ApiError, state::AppState, ws_connection};

#[derive(Debug, Deserialize)]
struct WsQuery {
    /// cookie 之外的备用凭证通道，便于非浏览器客户端接入
    token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BanResponse {
    message: String,
    is_banned: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClearMessagesResponse {
    message: String,
    removed: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(websocket_upgrade))
        .route("/messages", get(get_messages))
        .route("/admin/users/{subject_id}/ban", post(toggle_ban))
        .route("/admin/users/{subject_id}", delete(delete_user))
        .route("/admin/messages", delete(clear_messages))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// WebSocket 升级。凭证的校验在升级之后的准入阶段完成，
/// 这样可以用带原因的关闭帧答复客户端，而不是裸的 401。
async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    jar: CookieJar,
) -> Response {
    let credential = query
        .token
        .or_else(|| jar.get("token").map(|cookie| cookie.value().to_owned()));

    ws.on_upgrade(move |socket| ws_connection::serve(socket, state, credential))
}

/// 全量消息历史，created_at 升序。需要有效凭证，被封禁的用户拒绝访问。
async fn get_messages(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<Message>>, ApiError> {
    require_member(&state, &jar).await?;

    let messages = state.store.list_all().await?;
    Ok(Json(messages))
}

/// 读接口的准入：有效 token、目录中仍然存在且未被封禁。
async fn require_member(state: &AppState, jar: &CookieJar) -> Result<StandingRecord, ApiError> {
    let token = jar
        .get("token")
        .map(|cookie| cookie.value().to_owned())
        .ok_or_else(|| ApiError::unauthorized("not authenticated"))?;

    let claim = state
        .jwt
        .verify(&token)
        .map_err(|_| ApiError::unauthorized("not authenticated"))?;

    let standing = state
        .directory
        .get_standing(&claim.subject_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("not authenticated"))?;

    if standing.is_banned {
        return Err(ApiError::forbidden("user is banned"));
    }
    Ok(standing)
}

/// 管理接口的准入：在读准入之上再要求目录中的管理员标记。
async fn require_admin(state: &AppState, jar: &CookieJar) -> Result<StandingRecord, ApiError> {
    let standing = require_member(state, jar).await?;
    if !standing.is_admin {
        return Err(ApiError::forbidden("not authorized"));
    }
    Ok(standing)
}

/// 封禁/解封开关：读当前状态并取反，再走审核扇出。
async fn toggle_ban(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    jar: CookieJar,
) -> Result<Json<BanResponse>, ApiError> {
    require_admin(&state, &jar).await?;

    let subject_id = SubjectId::from(subject_id);
    let current = state
        .directory
        .get_standing(&subject_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    let record = state
        .moderation
        .apply_standing_change(&subject_id, !current.is_banned)
        .await?;

    Ok(Json(BanResponse {
        message: format!(
            "User {} successfully",
            if record.is_banned { "banned" } else { "unbanned" }
        ),
        is_banned: record.is_banned,
    }))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    jar: CookieJar,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &jar).await?;

    let subject_id = SubjectId::from(subject_id);
    state.moderation.delete_subject(&subject_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_messages(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<ClearMessagesResponse>, ApiError> {
    require_admin(&state, &jar).await?;

    let removed = state.moderation.clear_messages().await?;
    Ok(Json(ClearMessagesResponse {
        message: "All messages cleared successfully".to_owned(),
        removed,
    }))
}
