use domain::DomainError;
use thiserror::Error;

use crate::repository::StoreError;

/// 凭证验证失败。
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid credential: {0}")]
    Invalid(String),
}

/// 连接准入失败。
///
/// 准入错误对单次连接是终态的：不创建会话，不产生消息。
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// 缺少凭证或凭证验证失败
    #[error("authentication required")]
    Unauthenticated,
    /// 用户已被封禁，拒绝连接
    #[error("user is banned")]
    Banned,
    /// 用户已不存在，客户端需要重新认证
    #[error("user no longer exists")]
    IdentityGone,
    /// 目录查询失败
    #[error("directory lookup failed: {0}")]
    Directory(#[from] StoreError),
}

/// 消息发布失败。
///
/// 发布错误只终止当前这一次操作，连接任务继续服务后续请求，
/// 除非是 `Forbidden`（状态复查失败），它会同时驱逐会话。
#[derive(Debug, Error)]
pub enum PublishError {
    /// 状态复查发现用户被封禁或已删除
    #[error("user is banned or no longer exists")]
    Forbidden,
    /// 正文校验失败，未发起任何 I/O
    #[error(transparent)]
    MalformedInput(#[from] DomainError),
    /// 持久化或目录查询失败（含超时），仅通知发送者，不广播
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl From<StoreError> for PublishError {
    fn from(value: StoreError) -> Self {
        PublishError::StorageFailure(value.to_string())
    }
}

/// 审核操作失败。
#[derive(Debug, Error)]
pub enum ModerationError {
    /// 目录中没有这个用户
    #[error("subject not found")]
    SubjectNotFound,
    /// 目录或消息存储访问失败
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// 系统通知的持久化/广播失败
    #[error("system notice failed: {0}")]
    Notice(#[from] PublishError),
}
