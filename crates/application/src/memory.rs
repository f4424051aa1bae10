//! 外部接口的内存实现
//!
//! 测试和无数据库环境下的替身；生产路径用 infrastructure 里的
//! PostgreSQL 实现。

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{IdentityClaim, Message, StandingRecord, SubjectId};
use tokio::sync::RwLock;

use crate::error::CredentialError;
use crate::repository::{CredentialVerifier, MessageStore, StoreError, UserDirectory};

/// 固定映射的凭证验证器：凭证字符串 → 身份声明。
///
/// `CredentialVerifier::verify` 是同步接口，所以这里是整个模块里
/// 唯一的 std 锁；中毒时取回内部数据继续服务。
#[derive(Debug, Default)]
pub struct MemoryCredentialVerifier {
    claims: std::sync::RwLock<HashMap<String, IdentityClaim>>,
}

impl MemoryCredentialVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, credential: impl Into<String>, claim: IdentityClaim) {
        let mut claims = self
            .claims
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        claims.insert(credential.into(), claim);
    }
}

impl CredentialVerifier for MemoryCredentialVerifier {
    fn verify(&self, credential: &str) -> Result<IdentityClaim, CredentialError> {
        let claims = self
            .claims
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        claims
            .get(credential)
            .cloned()
            .ok_or_else(|| CredentialError::Invalid("unknown credential".to_owned()))
    }
}

/// 内存用户目录。
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<SubjectId, StandingRecord>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, record: StandingRecord) {
        let mut users = self.users.write().await;
        users.insert(record.subject_id.clone(), record);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn get_standing(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Option<StandingRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(subject_id).cloned())
    }

    async fn set_banned(
        &self,
        subject_id: &SubjectId,
        banned: bool,
    ) -> Result<Option<StandingRecord>, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(subject_id).map(|record| {
            record.is_banned = banned;
            record.clone()
        }))
    }

    async fn delete_user(&self, subject_id: &SubjectId) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        Ok(users.remove(subject_id).is_some())
    }
}

/// 内存消息存储，按插入顺序保存。
#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    messages: RwLock<Vec<Message>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(&self, message: &Message) -> Result<(), StoreError> {
        let mut messages = self.messages.write().await;
        messages.push(message.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Message>, StoreError> {
        let mut messages = self.messages.read().await.clone();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut messages = self.messages.write().await;
        let removed = messages.len() as u64;
        messages.clear();
        Ok(removed)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let messages = self.messages.read().await;
        Ok(messages.len() as u64)
    }
}
