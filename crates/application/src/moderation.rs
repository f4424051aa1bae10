//! 审核事件扇出
//!
//! 封禁/解封/删除由管理入口触发：先写用户目录，再更新注册表视图、
//! 向受影响的会话推送通知并选择性驱逐。目录写入成功后，
//! 单个会话的通知失败不会回滚，只记日志并照样驱逐。

use std::sync::Arc;
use std::time::Duration;

use domain::{StandingRecord, SubjectId};
use tokio::time::timeout;

use crate::error::ModerationError;
use crate::events::ServerEvent;
use crate::publish::PublishPipeline;
use crate::registry::SessionRegistry;
use crate::repository::{MessageStore, StoreError, UserDirectory};

pub struct ModerationFanout {
    directory: Arc<dyn UserDirectory>,
    store: Arc<dyn MessageStore>,
    registry: Arc<SessionRegistry>,
    publisher: Arc<PublishPipeline>,
    io_timeout: Duration,
}

impl ModerationFanout {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn MessageStore>,
        registry: Arc<SessionRegistry>,
        publisher: Arc<PublishPipeline>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            store,
            registry,
            publisher,
            io_timeout,
        }
    }

    /// 封禁或解封一个用户。
    ///
    /// 封禁：通知并驱逐该用户的全部会话，然后向剩余会话广播系统通知。
    /// 解封：只广播系统通知，不断开任何连接。
    pub async fn apply_standing_change(
        &self,
        subject_id: &SubjectId,
        banned: bool,
    ) -> Result<StandingRecord, ModerationError> {
        let record = timeout(self.io_timeout, self.directory.set_banned(subject_id, banned))
            .await
            .map_err(|_| {
                ModerationError::Store(StoreError::unavailable("directory update timed out"))
            })??
            .ok_or(ModerationError::SubjectNotFound)?;

        self.registry.update_standing(subject_id, banned).await;

        if banned {
            let evicted = self
                .registry
                .evict_subject(
                    subject_id,
                    ServerEvent::StandingChanged {
                        subject_id: subject_id.clone(),
                        is_banned: true,
                    },
                )
                .await;
            tracing::info!(subject_id = %subject_id, evicted, "用户已封禁，会话已驱逐");
            self.publisher
                .publish_system(format!(
                    "{} has been banned by an administrator",
                    record.display_name
                ))
                .await?;
        } else {
            tracing::info!(subject_id = %subject_id, "用户已解封");
            self.publisher
                .publish_system(format!(
                    "{} has been unbanned by an administrator",
                    record.display_name
                ))
                .await?;
        }

        Ok(record)
    }

    /// 删除一个用户并通知其所有会话。
    ///
    /// 删除本身不持久化任何消息，只向受影响的客户端发出带外信号，
    /// 让它们强制重新认证。
    pub async fn delete_subject(&self, subject_id: &SubjectId) -> Result<(), ModerationError> {
        let existed = timeout(self.io_timeout, self.directory.delete_user(subject_id))
            .await
            .map_err(|_| {
                ModerationError::Store(StoreError::unavailable("directory delete timed out"))
            })??;

        // 无论目录里是否还有记录，残留会话都要驱逐
        let evicted = self
            .registry
            .evict_subject(
                subject_id,
                ServerEvent::AccountDeleted {
                    subject_id: subject_id.clone(),
                },
            )
            .await;
        tracing::info!(subject_id = %subject_id, evicted, existed, "用户删除扇出完成");

        if existed {
            Ok(())
        } else {
            Err(ModerationError::SubjectNotFound)
        }
    }

    /// 清空全部消息：先持久化并广播一条系统通知，再清库。
    /// 这个操作不断开任何会话。
    pub async fn clear_messages(&self) -> Result<u64, ModerationError> {
        self.publisher
            .publish_system("🗑️ An administrator is clearing all messages...")
            .await?;

        let removed = timeout(self.io_timeout, self.store.delete_all())
            .await
            .map_err(|_| {
                ModerationError::Store(StoreError::unavailable("message purge timed out"))
            })??;
        tracing::info!(removed, "消息已清空");
        Ok(removed)
    }

    /// 向所有会话广播一条系统通知。
    pub async fn broadcast_system_notice(
        &self,
        text: impl Into<String>,
    ) -> Result<(), ModerationError> {
        self.publisher.publish_system(text).await?;
        Ok(())
    }
}
