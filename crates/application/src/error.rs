use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::broadcaster::BroadcastError;
use crate::rate_limiter::CounterStoreError;
use crate::validator::ValidationError;

/// 应用层统一错误。每个变体都有稳定的错误码、对外提示和是否可重试
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplicationError {
    #[error("authentication required")]
    AuthenticationRequired,
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("rate limit exceeded: {limit} questions per {window_seconds}s")]
    RateLimited { limit: u32, window_seconds: u64 },
    #[error("session not found")]
    SessionNotFound,
    #[error("question submissions are disabled for this session")]
    SubmissionsDisabled,
    #[error("question not found")]
    QuestionNotFound,
    #[error("transient failure during {operation}: {message}")]
    Transient {
        operation: &'static str,
        message: String,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ApplicationError::MalformedRequest(message.into())
    }

    pub fn transient(operation: &'static str, message: impl Into<String>) -> Self {
        ApplicationError::Transient {
            operation,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApplicationError::Internal(message.into())
    }

    /// 给瞬时错误补上具体的外部调用名称
    pub fn in_operation(self, operation: &'static str) -> Self {
        match self {
            ApplicationError::Transient { message, .. } => {
                ApplicationError::Transient { operation, message }
            }
            other => other,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApplicationError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            ApplicationError::MalformedRequest(_) => "MALFORMED_REQUEST",
            ApplicationError::Validation(err) => err.code(),
            ApplicationError::RateLimited { .. } => "RATE_LIMITED",
            ApplicationError::SessionNotFound => "SESSION_NOT_FOUND",
            ApplicationError::SubmissionsDisabled => "SUBMISSIONS_DISABLED",
            ApplicationError::QuestionNotFound => "QUESTION_NOT_FOUND",
            ApplicationError::Transient { .. } => "TEMPORARILY_UNAVAILABLE",
            ApplicationError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 可以直接展示给提问者的文案。内部细节不会出现在这里
    pub fn public_message(&self) -> String {
        match self {
            ApplicationError::AuthenticationRequired => "Authentication required.".to_string(),
            ApplicationError::MalformedRequest(reason) => format!("Invalid request: {reason}."),
            ApplicationError::Validation(err) => err.to_string(),
            ApplicationError::RateLimited { .. } => {
                "Rate limit exceeded. Please wait before asking another question.".to_string()
            }
            ApplicationError::SessionNotFound => "Session not found.".to_string(),
            ApplicationError::SubmissionsDisabled => {
                "Question submissions are currently disabled for this session.".to_string()
            }
            ApplicationError::QuestionNotFound => "Question not found.".to_string(),
            ApplicationError::Transient { .. } => {
                "The service is temporarily unavailable. Please try again.".to_string()
            }
            ApplicationError::Internal(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ApplicationError::Transient { .. })
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Timeout { operation } => {
                ApplicationError::transient("storage", format!("{operation} timed out"))
            }
            RepositoryError::Unavailable { message } => {
                ApplicationError::transient("storage", message)
            }
            other => ApplicationError::Internal(other.to_string()),
        }
    }
}

impl From<DomainError> for ApplicationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidStatusTransition { from, to } => {
                ApplicationError::Validation(ValidationError::InvalidStatusTransition { from, to })
            }
            DomainError::InvalidArgument { field, reason } => {
                ApplicationError::MalformedRequest(format!("{field} {reason}"))
            }
        }
    }
}

impl From<CounterStoreError> for ApplicationError {
    fn from(value: CounterStoreError) -> Self {
        match value {
            CounterStoreError::Unavailable(message) => {
                ApplicationError::transient("rate_limit", message)
            }
            CounterStoreError::Protocol(message) => ApplicationError::Internal(message),
        }
    }
}

impl From<BroadcastError> for ApplicationError {
    fn from(value: BroadcastError) -> Self {
        ApplicationError::transient("broadcast", value.to_string())
    }
}
