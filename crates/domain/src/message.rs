use crate::standing::IdentityClaim;
use crate::value_objects::{MessageBody, MessageId, SubjectId, Timestamp};

/// 聊天消息。
///
/// id 与时间戳一律由服务端分配，持久化成功之后才允许广播，
/// 此后不可变。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub author_id: SubjectId,
    pub author_name: String,
    pub body: MessageBody,
    pub created_at: Timestamp,
}

impl Message {
    /// 来自已认证用户的消息，作者信息取自连接建立时的身份声明。
    pub fn from_claim(claim: &IdentityClaim, body: MessageBody, created_at: Timestamp) -> Self {
        Self {
            id: MessageId::generate(),
            author_id: claim.subject_id.clone(),
            author_name: claim.display_name.clone(),
            body,
            created_at,
        }
    }

    /// 服务端通知消息，使用保留的 `system` 作者。
    pub fn system(body: MessageBody, created_at: Timestamp) -> Self {
        Self {
            id: MessageId::generate(),
            author_id: SubjectId::system(),
            author_name: "System".to_owned(),
            body,
            created_at,
        }
    }

    pub fn is_system(&self) -> bool {
        self.author_id.is_system()
    }
}
