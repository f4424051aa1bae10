//! 连接准入控制
//!
//! 每条入站连接执行一次：验证凭证、检查用户当前状态、
//! 将身份声明绑定到会话并注册。准入本身不产生任何消息。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::clock::Clock;
use crate::error::AdmissionError;
use crate::events::ServerEvent;
use crate::registry::{Session, SessionRegistry};
use crate::repository::{CredentialVerifier, StoreError, UserDirectory};

pub struct AdmissionController {
    verifier: Arc<dyn CredentialVerifier>,
    directory: Arc<dyn UserDirectory>,
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    io_timeout: Duration,
}

impl AdmissionController {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        directory: Arc<dyn UserDirectory>,
        registry: Arc<SessionRegistry>,
        clock: Arc<dyn Clock>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            directory,
            registry,
            clock,
            io_timeout,
        }
    }

    /// 准入一条连接。
    ///
    /// 成功时会话已插入注册表；失败时注册表保持原样。
    /// 多个准入可以并发进行，除注册表插入外没有共享可变状态。
    pub async fn admit(
        &self,
        credential: Option<&str>,
        outbound: mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<Session, AdmissionError> {
        let credential = credential.ok_or(AdmissionError::Unauthenticated)?;

        let claim = self.verifier.verify(credential).map_err(|err| {
            tracing::debug!(error = %err, "credential verification failed");
            AdmissionError::Unauthenticated
        })?;

        let standing = timeout(self.io_timeout, self.directory.get_standing(&claim.subject_id))
            .await
            .map_err(|_| {
                AdmissionError::Directory(StoreError::unavailable("standing lookup timed out"))
            })??
            .ok_or(AdmissionError::IdentityGone)?;

        if standing.is_banned {
            tracing::info!(subject_id = %claim.subject_id, "admission refused: banned");
            return Err(AdmissionError::Banned);
        }

        let session = Session::new(claim, self.clock.now(), outbound);
        self.registry.insert(session.clone()).await;
        tracing::info!(
            connection_id = %session.connection_id,
            subject_id = %session.claim.subject_id,
            "会话已准入"
        );
        Ok(session)
    }
}
