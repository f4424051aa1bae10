use async_trait::async_trait;
use domain::{IdentityClaim, Message, StandingRecord, SubjectId};
use thiserror::Error;

use crate::error::CredentialError;

/// 外部存储错误。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// 凭证验证器。
///
/// 把握手阶段拿到的不透明凭证换成身份声明；验证是纯计算，不做 I/O。
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<IdentityClaim, CredentialError>;
}

/// 用户目录，授权决策的唯一事实来源。
///
/// 准入和发布流水线都通过 `get_standing` 读取当前状态，
/// 审核操作通过 `set_banned` / `delete_user` 写入。
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 返回 `None` 表示用户已不存在。
    async fn get_standing(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Option<StandingRecord>, StoreError>;

    /// 更新封禁标记，返回更新后的记录；`None` 表示用户不存在。
    async fn set_banned(
        &self,
        subject_id: &SubjectId,
        banned: bool,
    ) -> Result<Option<StandingRecord>, StoreError>;

    /// 删除用户，返回是否真的删除了记录。
    async fn delete_user(&self, subject_id: &SubjectId) -> Result<bool, StoreError>;
}

/// 消息存储。
///
/// 单条消息的写入是一次性的，这里不做内部重试，避免重复插入。
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: &Message) -> Result<(), StoreError>;

    /// 按 created_at 升序返回全部消息。
    async fn list_all(&self) -> Result<Vec<Message>, StoreError>;

    /// 清空消息，返回删除数量。
    async fn delete_all(&self) -> Result<u64, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}
