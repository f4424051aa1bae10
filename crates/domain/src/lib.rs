//! 聊天系统核心领域模型
//!
//! 包含消息、身份声明、用户状态等核心实体及其校验规则。
//! 领域层不做任何 I/O。

pub mod errors;
pub mod message;
pub mod standing;
pub mod value_objects;

// 重新导出常用类型
pub use errors::DomainError;
pub use message::Message;
pub use standing::{IdentityClaim, StandingRecord};
pub use value_objects::{ConnectionId, MessageBody, MessageId, SubjectId, Timestamp};
