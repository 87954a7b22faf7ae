//! 领域模型错误定义
//!
//! 定义了领域层和仓储层可能出现的错误类型，提供清晰的错误上下文。

use thiserror::Error;

use crate::question::QuestionStatus;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 参数校验失败
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    /// 状态只能向前流转
    #[error("question status cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: QuestionStatus,
        to: QuestionStatus,
    },
}

impl DomainError {
    /// 创建参数校验错误
    pub fn invalid_argument(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}

/// 仓储层错误
///
/// `Unavailable` 与 `Timeout` 属于可重试的基础设施故障，其余均视为内部错误。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },
    #[error("storage operation timed out: {operation}")]
    Timeout { operation: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// 是否为暂时性故障（超时或存储不可达）
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
