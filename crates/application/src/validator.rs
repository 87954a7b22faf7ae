//! 提问内容校验
//!
//! 纯函数、无副作用。HTTP 与 WebSocket 两个入口共用同一份实现。

use domain::{
    trim_content, QuestionContent, QuestionStatus, Visibility, QUESTION_MAX_LENGTH,
    QUESTION_MIN_LENGTH,
};
use thiserror::Error;

/// 校验失败的具体原因，调用方可据此给出不同提示
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Question content is required.")]
    ContentRequired,
    #[error("Question must be at least {min} characters.")]
    ContentTooShort { min: usize },
    #[error("Question must be no more than {max} characters.")]
    ContentTooLong { max: usize },
    #[error("Invalid visibility setting. Must be PUBLIC or INSTRUCTOR_ONLY.")]
    InvalidVisibility { value: String },
    #[error("Invalid status. Must be OPEN, ANSWERED or RESOLVED.")]
    InvalidStatus { value: String },
    #[error("Question status cannot move from {from} to {to}.")]
    InvalidStatusTransition {
        from: QuestionStatus,
        to: QuestionStatus,
    },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::ContentRequired => "CONTENT_REQUIRED",
            ValidationError::ContentTooShort { .. } => "CONTENT_TOO_SHORT",
            ValidationError::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            ValidationError::InvalidVisibility { .. } => "INVALID_VISIBILITY",
            ValidationError::InvalidStatus { .. } => "INVALID_STATUS",
            ValidationError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
        }
    }
}

/// 校验提问内容，返回去除首尾空白后的内容
pub fn validate_content(content: Option<&str>) -> Result<QuestionContent, ValidationError> {
    let raw = match content {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ValidationError::ContentRequired),
    };

    let length = trim_content(raw).chars().count();
    if length < QUESTION_MIN_LENGTH {
        return Err(ValidationError::ContentTooShort {
            min: QUESTION_MIN_LENGTH,
        });
    }
    if length > QUESTION_MAX_LENGTH {
        return Err(ValidationError::ContentTooLong {
            max: QUESTION_MAX_LENGTH,
        });
    }

    QuestionContent::parse(raw).map_err(|_| ValidationError::ContentRequired)
}

/// 校验可见性。未提供时返回 None，由调用方决定默认值
pub fn validate_visibility(visibility: Option<&str>) -> Result<Option<Visibility>, ValidationError> {
    match visibility {
        None => Ok(None),
        Some(value) => value
            .parse::<Visibility>()
            .map(Some)
            .map_err(|_| ValidationError::InvalidVisibility {
                value: value.to_owned(),
            }),
    }
}

pub fn validate_status(status: Option<&str>) -> Result<QuestionStatus, ValidationError> {
    let value = status.unwrap_or_default();
    value
        .parse::<QuestionStatus>()
        .map_err(|_| ValidationError::InvalidStatus {
            value: value.to_owned(),
        })
}
