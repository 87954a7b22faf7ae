use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// 统一的时间戳类型。
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// 提问内容的最小长度（去除首尾空白后，按字符计）。
pub const QUESTION_MIN_LENGTH: usize = 5;
/// 提问内容的最大长度（去除首尾空白后，按字符计）。
pub const QUESTION_MAX_LENGTH: usize = 500;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

uuid_id!(
    /// 用户唯一标识（由认证层解析得到）。
    UserId
);
uuid_id!(
    /// 课堂会话唯一标识。
    SessionId
);
uuid_id!(
    /// 提问唯一标识。
    QuestionId
);
uuid_id!(
    /// 课程唯一标识。
    CourseId
);

/// 幻灯片/页面引用，由外部文档系统分配，这里只做透传。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlideId(String);

impl SlideId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 经过校验的提问内容。
///
/// 持有的始终是去除首尾空白之后的文本，长度在
/// [`QUESTION_MIN_LENGTH`, `QUESTION_MAX_LENGTH`] 之间。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionContent(String);

impl QuestionContent {
    pub fn parse(value: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = trim_content(value.as_ref());
        let length = trimmed.chars().count();
        if length < QUESTION_MIN_LENGTH {
            return Err(DomainError::invalid_argument(
                "content",
                format!("must be at least {QUESTION_MIN_LENGTH} characters"),
            ));
        }
        if length > QUESTION_MAX_LENGTH {
            return Err(DomainError::invalid_argument(
                "content",
                format!("must be no more than {QUESTION_MAX_LENGTH} characters"),
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// 去除首尾空白，字节序标记 U+FEFF 也算作空白
pub fn trim_content(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

impl fmt::Display for QuestionContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
