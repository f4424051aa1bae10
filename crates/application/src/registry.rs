//! 会话注册表
//!
//! 进程内唯一被多个任务并发修改的结构。所有修改都走这里的方法，
//! 锁从不跨越外部 I/O 持有；广播一律基于时间点快照。

use std::collections::HashMap;

use domain::{ConnectionId, IdentityClaim, SubjectId, Timestamp};
use tokio::sync::{mpsc, RwLock};

use crate::events::ServerEvent;

/// 一条活跃连接。
///
/// 由注册表在准入成功时创建，断开或强制驱逐时销毁。
/// `is_banned` 是准入时的状态快照，发布路径永远重新查目录，不信任它。
#[derive(Debug, Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub claim: IdentityClaim,
    pub is_banned: bool,
    pub created_at: Timestamp,
    outbound: mpsc::UnboundedSender<ServerEvent>,
}

impl Session {
    pub fn new(
        claim: IdentityClaim,
        created_at: Timestamp,
        outbound: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        Self {
            connection_id: ConnectionId::generate(),
            claim,
            is_banned: false,
            created_at,
            outbound,
        }
    }

    /// 向会话的传输端投递事件，返回是否送达（false 表示对端已消失）。
    pub fn send(&self, event: ServerEvent) -> bool {
        self.outbound.send(event).is_ok()
    }

    pub fn subject_id(&self) -> &SubjectId {
        &self.claim.subject_id
    }
}

/// 连接标识 → 会话 的并发安全映射。
///
/// 注入使用，不做单例。
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.connection_id, session);
    }

    /// 移除会话。对已不存在的会话是无操作，从不报错。
    pub async fn remove(&self, connection_id: ConnectionId) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&connection_id)
    }

    pub async fn get(&self, connection_id: ConnectionId) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(&connection_id).cloned()
    }

    /// 时间点快照，供广播迭代。快照期间的插入/移除不影响本次迭代，
    /// 正在断开的会话可能收到也可能收不到在途消息，两者都可接受。
    pub async fn snapshot(&self) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        sessions.values().cloned().collect()
    }

    pub async fn sessions_for_subject(&self, subject_id: &SubjectId) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|session| session.subject_id() == subject_id)
            .cloned()
            .collect()
    }

    /// 更新某个用户所有会话的封禁快照，返回受影响的会话数。
    pub async fn update_standing(&self, subject_id: &SubjectId, is_banned: bool) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut updated = 0;
        for session in sessions.values_mut() {
            if session.subject_id() == subject_id {
                session.is_banned = is_banned;
                updated += 1;
            }
        }
        updated
    }

    /// 驱逐某个用户的全部会话：先投递通知事件，再从注册表移除。
    ///
    /// 通知失败只记日志，会话照样驱逐。返回实际移除的会话数。
    pub async fn evict_subject(&self, subject_id: &SubjectId, notice: ServerEvent) -> usize {
        let targets = self.sessions_for_subject(subject_id).await;
        let mut evicted = 0;
        for session in targets {
            if !session.send(notice.clone()) {
                tracing::warn!(
                    connection_id = %session.connection_id,
                    subject_id = %subject_id,
                    "eviction notify failed, evicting session anyway"
                );
            }
            if self.remove(session.connection_id).await.is_some() {
                evicted += 1;
            }
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
