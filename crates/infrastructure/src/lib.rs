//! 基础设施层实现。
//!
//! 提供消息存储与用户目录的 PostgreSQL 适配器，实现应用层定义的接口。

pub mod repository;

pub use repository::{create_pg_pool, PgMessageStore, PgUserDirectory};
