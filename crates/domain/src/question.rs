use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::room::Room;
use crate::value_objects::{QuestionContent, QuestionId, SessionId, SlideId, Timestamp, UserId};

/// 提问的可见范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    #[default]
    Public,
    InstructorOnly,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::InstructorOnly => "INSTRUCTOR_ONLY",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = DomainError;

    /// 只接受精确的枚举值，不做大小写兼容
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PUBLIC" => Ok(Visibility::Public),
            "INSTRUCTOR_ONLY" => Ok(Visibility::InstructorOnly),
            other => Err(DomainError::invalid_argument(
                "visibility",
                format!("unknown visibility {other:?}"),
            )),
        }
    }
}

/// 提问状态，只能 OPEN → ANSWERED → RESOLVED 单向流转
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStatus {
    #[default]
    Open,
    Answered,
    Resolved,
}

impl QuestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Open => "OPEN",
            QuestionStatus::Answered => "ANSWERED",
            QuestionStatus::Resolved => "RESOLVED",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            QuestionStatus::Open => 0,
            QuestionStatus::Answered => 1,
            QuestionStatus::Resolved => 2,
        }
    }

    /// 是否允许流转到 `next`（必须严格向前）
    pub fn can_transition_to(&self, next: QuestionStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for QuestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "OPEN" => Ok(QuestionStatus::Open),
            "ANSWERED" => Ok(QuestionStatus::Answered),
            "RESOLVED" => Ok(QuestionStatus::Resolved),
            other => Err(DomainError::invalid_argument(
                "status",
                format!("unknown status {other:?}"),
            )),
        }
    }
}

/// 提问实体
///
/// `author_id` 无论是否匿名都会保存（用于审计）；对外的投影负责隐去作者。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub session_id: SessionId,
    pub author_id: UserId,
    pub content: QuestionContent,
    pub visibility: Visibility,
    pub is_anonymous: bool,
    pub status: QuestionStatus,
    pub upvote_count: u32,
    pub slide_id: Option<SlideId>,
    pub created_at: Timestamp,
}

impl Question {
    /// 新建一个处于 OPEN 状态、零点赞的提问
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: QuestionId,
        session_id: SessionId,
        author_id: UserId,
        content: QuestionContent,
        visibility: Visibility,
        is_anonymous: bool,
        slide_id: Option<SlideId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            session_id,
            author_id,
            content,
            visibility,
            is_anonymous,
            status: QuestionStatus::Open,
            upvote_count: 0,
            slide_id,
            created_at,
        }
    }

    /// 对外可见的作者：匿名提问一律返回 None
    pub fn public_author(&self) -> Option<UserId> {
        if self.is_anonymous {
            None
        } else {
            Some(self.author_id)
        }
    }

    /// 该提问应当推送到的房间
    pub fn room(&self) -> Room {
        Room::for_visibility(self.session_id, self.visibility)
    }

    pub fn transition_to(&mut self, next: QuestionStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// 列表查询的过滤条件，各字段相互独立、可任意组合
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub visibility: Option<Visibility>,
    pub status: Option<QuestionStatus>,
}

impl QuestionFilter {
    pub fn matches(&self, question: &Question) -> bool {
        self.visibility.map_or(true, |v| v == question.visibility)
            && self.status.map_or(true, |s| s == question.status)
    }
}

/// 列表查询结果项：提问本身加上持久层统计的回答数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedQuestion {
    pub question: Question,
    pub answer_count: u32,
}
