//! WebSocket 连接生命周期
//!
//! 每条连接一个任务：升级后先走准入，失败则带认证失败信号关闭，
//! 成功后进入主循环，转发广播事件并处理客户端的发布请求。
//! 连接断开只取消本会话的未决操作；已提交持久化的发布在循环体内
//! 等待完成，不会因对端消失而中止。

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use application::{AdmissionError, ClientEvent, PublishError, ServerEvent, Session};

use crate::state::AppState;

/// 认证失败时使用的应用层关闭码。
const CLOSE_UNAUTHENTICATED: u16 = 4401;
const CLOSE_BANNED: u16 = 4403;
const CLOSE_IDENTITY_GONE: u16 = 4404;
const CLOSE_INTERNAL: u16 = 1011;

pub async fn serve(socket: WebSocket, state: AppState, credential: Option<String>) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    let session = match state
        .admission
        .admit(credential.as_deref(), outbound_tx)
        .await
    {
        Ok(session) => session,
        Err(err) => {
            refuse(socket, &err).await;
            return;
        }
    };

    run_session(socket, &state, &session, outbound_rx).await;

    // 正常断开与驱逐共用同一条清理路径；重复移除是无操作
    state.registry.remove(session.connection_id).await;
    tracing::info!(
        connection_id = %session.connection_id,
        subject_id = %session.claim.subject_id,
        "WebSocket连接已断开"
    );
}

/// 准入失败：在接受任何事件之前用认证失败信号关闭连接。
async fn refuse(mut socket: WebSocket, err: &AdmissionError) {
    let (code, reason) = match err {
        AdmissionError::Unauthenticated => (CLOSE_UNAUTHENTICATED, "authentication required"),
        AdmissionError::Banned => (CLOSE_BANNED, "user is banned"),
        AdmissionError::IdentityGone => (CLOSE_IDENTITY_GONE, "user no longer exists"),
        AdmissionError::Directory(_) => (CLOSE_INTERNAL, "directory unavailable"),
    };
    tracing::info!(code, reason, "连接被拒绝");
    let _ = socket
        .send(WsMessage::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}

async fn run_session(
    socket: WebSocket,
    state: &AppState,
    session: &Session,
    mut outbound_rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let (mut sender, mut incoming) = socket.split();

    loop {
        tokio::select! {
            event = outbound_rx.recv() => {
                let Some(event) = event else { break };
                let evicted = is_eviction_of(session, &event);
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to serialize outbound event");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
                if evicted {
                    // 通知已送出，之后关闭传输，会话不再回到注册表
                    let _ = sender
                        .send(WsMessage::Close(Some(CloseFrame {
                            code: CLOSE_BANNED,
                            reason: "standing revoked".into(),
                        })))
                        .await;
                    break;
                }
            }
            frame = incoming.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_client_frame(state, session, text.as_str()).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    // Ping/Pong 由底层协议栈处理，Binary 不在协议内
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

/// 本会话的主体是否刚被驱逐（封禁或账号删除）。
fn is_eviction_of(session: &Session, event: &ServerEvent) -> bool {
    match event {
        ServerEvent::StandingChanged {
            subject_id,
            is_banned: true,
        } => subject_id == session.subject_id(),
        ServerEvent::AccountDeleted { subject_id } => subject_id == session.subject_id(),
        _ => false,
    }
}

async fn handle_client_frame(state: &AppState, session: &Session, raw: &str) {
    let event: ClientEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(error = %err, "unparseable client frame");
            session.send(ServerEvent::OperationFailed {
                reason: "malformed request".to_owned(),
            });
            return;
        }
    };

    match event {
        ClientEvent::SubmitMessage { body } => {
            match state.publisher.publish(session, body).await {
                Ok(_) => {}
                Err(PublishError::Forbidden) => {
                    // 驱逐通知已经在发布流水线里排队，主循环会转发并关闭连接
                    tracing::info!(subject_id = %session.claim.subject_id, "publish forbidden, session evicted");
                }
                Err(err) => {
                    session.send(ServerEvent::OperationFailed {
                        reason: err.to_string(),
                    });
                }
            }
        }
    }
}
