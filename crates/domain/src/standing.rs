use serde::{Deserialize, Serialize};

use crate::value_objects::SubjectId;

/// 从凭证中得到的身份声明。
///
/// 连接建立时解析一次，在连接生命周期内不变；
/// 用户改名不会回写到已打开的会话。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub subject_id: SubjectId,
    pub display_name: String,
}

impl IdentityClaim {
    pub fn new(subject_id: impl Into<SubjectId>, display_name: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// 用户目录中的当前状态，授权决策的唯一依据。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRecord {
    pub subject_id: SubjectId,
    pub display_name: String,
    pub is_banned: bool,
    pub is_admin: bool,
}
