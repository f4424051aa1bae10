//! 应用层实现。
//!
//! 这里提供消息代理的核心用例：连接准入、发布/持久化/广播流水线、
//! 审核事件扇出，以及对外部适配器（凭证验证、用户目录、消息存储）的抽象。

pub mod admission;
pub mod clock;
pub mod error;
pub mod events;
pub mod memory;
pub mod moderation;
pub mod publish;
pub mod registry;
pub mod repository;


pub use admission::AdmissionController;
pub use clock::{Clock, SystemClock};
pub use error::{AdmissionError, CredentialError, ModerationError, PublishError};
pub use events::{ClientEvent, ServerEvent};
pub use memory::{MemoryCredentialVerifier, MemoryMessageStore, MemoryUserDirectory};
pub use moderation::ModerationFanout;
pub use publish::PublishPipeline;
pub use registry::{Session, SessionRegistry};
pub use repository::{CredentialVerifier, MessageStore, StoreError, UserDirectory};
