use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Message, MessageBody, MessageId, StandingRecord, SubjectId};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use application::{MessageStore, StoreError, UserDirectory};

fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    StoreError::unavailable(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> StoreError {
    StoreError::unavailable(message)
}

pub async fn create_pg_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    author_id: String,
    author_name: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = StoreError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let body = MessageBody::parse(value.body).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Message {
            id: MessageId::from(value.id),
            author_id: SubjectId::from(value.author_id),
            author_name: value.author_name,
            body,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct UserRecord {
    subject_id: String,
    username: String,
    is_banned: bool,
    is_admin: bool,
}

impl From<UserRecord> for StandingRecord {
    fn from(value: UserRecord) -> Self {
        StandingRecord {
            subject_id: SubjectId::from(value.subject_id),
            display_name: value.username,
            is_banned: value.is_banned,
            is_admin: value.is_admin,
        }
    }
}

/// 消息存储的 PostgreSQL 实现。
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn insert(&self, message: &Message) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO messages (id, author_id, author_name, body, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(message.id))
        .bind(message.author_id.as_str())
        .bind(&message.author_name)
        .bind(message.body.as_str())
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Message>, StoreError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, author_id, author_name, body, created_at \
             FROM messages ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM messages")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(count as u64)
    }
}

/// 用户目录的 PostgreSQL 实现。
///
/// 账号的创建与口令管理属于外部的注册/登录层，这里只读写
/// 授权决策需要的字段。
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_standing(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Option<StandingRecord>, StoreError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT subject_id, username, is_banned, is_admin \
             FROM users WHERE subject_id = $1",
        )
        .bind(subject_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(StandingRecord::from))
    }

    async fn set_banned(
        &self,
        subject_id: &SubjectId,
        banned: bool,
    ) -> Result<Option<StandingRecord>, StoreError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "UPDATE users SET is_banned = $2 WHERE subject_id = $1 \
             RETURNING subject_id, username, is_banned, is_admin",
        )
        .bind(subject_id.as_str())
        .bind(banned)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(StandingRecord::from))
    }

    async fn delete_user(&self, subject_id: &SubjectId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE subject_id = $1")
            .bind(subject_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(result.rows_affected() > 0)
    }
}
