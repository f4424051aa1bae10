//! 传输边界上的事件定义。
//!
//! 事件以 JSON 编码，`event` 字段为标签、`data` 字段为负载，
//! 命名与客户端约定保持 camelCase。

use domain::{Message, SubjectId};
use serde::{Deserialize, Serialize};

/// 服务端推送给客户端的事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// 一条消息已持久化并广播
    #[serde(rename_all = "camelCase")]
    MessageAdded { message: Message },
    /// 用户封禁状态变化；被封禁的会话随后会被断开
    #[serde(rename_all = "camelCase")]
    StandingChanged {
        subject_id: SubjectId,
        is_banned: bool,
    },
    /// 账号已删除，客户端需要强制重新认证
    #[serde(rename_all = "camelCase")]
    AccountDeleted { subject_id: SubjectId },
    /// 单次操作失败，作为瞬态反馈展示
    #[serde(rename_all = "camelCase")]
    OperationFailed { reason: String },
}

/// 客户端发来的事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    SubmitMessage { body: String },
}
