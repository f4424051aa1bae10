//! 发布流水线
//!
//! 入站消息的完整路径：状态复查 → 构造消息 → 持久化 → 广播。
//! 只有持久化成功的消息才会广播；持久化失败只通知发送者。

use std::sync::Arc;
use std::time::Duration;

use domain::{Message, MessageBody};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::clock::Clock;
use crate::error::PublishError;
use crate::events::ServerEvent;
use crate::registry::{Session, SessionRegistry};
use crate::repository::{MessageStore, UserDirectory};

pub struct PublishPipeline {
    directory: Arc<dyn UserDirectory>,
    store: Arc<dyn MessageStore>,
    registry: Arc<SessionRegistry>,
    clock: Arc<dyn Clock>,
    io_timeout: Duration,
    // 广播顺序必须等于持久化提交顺序：持久化与扇出在同一把锁内完成，
    // 提交和广播之间不存在其他提交插入的窗口。锁内唯一的 I/O 是
    // 消息插入本身，投递走无界通道不会阻塞。
    commit_lock: Mutex<()>,
}

impl PublishPipeline {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn MessageStore>,
        registry: Arc<SessionRegistry>,
        clock: Arc<dyn Clock>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            store,
            registry,
            clock,
            io_timeout,
            commit_lock: Mutex::new(()),
        }
    }

    /// 发布一条来自已准入会话的消息。
    ///
    /// 状态永远重新查目录，不信任准入时的快照：用户可能在会话中途被封禁。
    /// 复查失败时当场驱逐该用户的全部会话，不持久化也不广播。
    pub async fn publish(
        &self,
        session: &Session,
        body: impl Into<String>,
    ) -> Result<Message, PublishError> {
        let body = MessageBody::parse(body)?;

        let subject_id = session.subject_id().clone();
        let standing = match timeout(self.io_timeout, self.directory.get_standing(&subject_id))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(PublishError::StorageFailure(
                    "standing re-check timed out".to_owned(),
                ))
            }
        };

        match standing {
            Some(record) if !record.is_banned => {}
            Some(_) => {
                tracing::info!(subject_id = %subject_id, "publish refused: banned mid-session");
                self.registry
                    .evict_subject(
                        &subject_id,
                        ServerEvent::StandingChanged {
                            subject_id: subject_id.clone(),
                            is_banned: true,
                        },
                    )
                    .await;
                return Err(PublishError::Forbidden);
            }
            None => {
                tracing::info!(subject_id = %subject_id, "publish refused: subject gone");
                self.registry
                    .evict_subject(
                        &subject_id,
                        ServerEvent::AccountDeleted {
                            subject_id: subject_id.clone(),
                        },
                    )
                    .await;
                return Err(PublishError::Forbidden);
            }
        }

        let message = Message::from_claim(&session.claim, body, self.clock.now());
        let _ordering = self.commit_lock.lock().await;
        self.persist(&message).await?;
        self.broadcast(&message).await;
        Ok(message)
    }

    /// 服务端通知路径：保留的 `system` 作者，跳过状态复查，
    /// 其余与普通发布完全一致（先持久化后广播）。
    pub async fn publish_system(&self, text: impl Into<String>) -> Result<Message, PublishError> {
        let body = MessageBody::parse(text)?;
        let message = Message::system(body, self.clock.now());
        let _ordering = self.commit_lock.lock().await;
        self.persist(&message).await?;
        self.broadcast(&message).await;
        Ok(message)
    }

    async fn persist(&self, message: &Message) -> Result<(), PublishError> {
        match timeout(self.io_timeout, self.store.insert(message)).await {
            Ok(Ok(())) => {
                tracing::debug!(message_id = %message.id, author_id = %message.author_id, "消息已持久化");
                Ok(())
            }
            Ok(Err(err)) => {
                tracing::error!(message_id = %message.id, error = %err, "message insert failed");
                Err(err.into())
            }
            Err(_) => {
                tracing::error!(message_id = %message.id, "message insert timed out");
                Err(PublishError::StorageFailure(
                    "message insert timed out".to_owned(),
                ))
            }
        }
    }

    /// 把已提交的消息扇出到注册表快照中的每个会话（含发送者自己）。
    /// 调用方持有提交锁。
    async fn broadcast(&self, message: &Message) {
        let sessions = self.registry.snapshot().await;
        let mut delivered = 0usize;
        for session in sessions {
            if session.send(ServerEvent::MessageAdded {
                message: message.clone(),
            }) {
                delivered += 1;
            } else {
                // 传输端已消失，顺手清理注册表
                tracing::debug!(
                    connection_id = %session.connection_id,
                    "pruning session with closed transport"
                );
                self.registry.remove(session.connection_id).await;
            }
        }
        tracing::debug!(message_id = %message.id, delivered, "消息已广播");
    }
}
