use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::UserId;
use thiserror::Error;

use crate::deadline::bounded;
use crate::error::ApplicationError;

/// 计数存储错误
#[derive(Debug, Clone, Error)]
pub enum CounterStoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
    #[error("counter store protocol error: {0}")]
    Protocol(String),
}

/// 带过期时间的计数存储。原子性由实现方保证
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 计数已达上限时返回 true 且不自增；否则自增，首次自增时设置过期时间
    async fn increment_and_check(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<bool, CounterStoreError>;

    /// 归还一次计数，不会减到零以下
    async fn release(&self, key: &str) -> Result<(), CounterStoreError>;
}

/// 固定窗口限流参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: 10,
            window: Duration::from_secs(60),
        }
    }
}

/// 按提问者限流
pub struct QuestionRateLimiter {
    store: Arc<dyn CounterStore>,
    policy: RateLimitPolicy,
    call_timeout: Duration,
}

impl QuestionRateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, policy: RateLimitPolicy, call_timeout: Duration) -> Self {
        Self {
            store,
            policy,
            call_timeout,
        }
    }

    pub fn key_for(author_id: UserId) -> String {
        format!("ratelimit:question:{author_id}")
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub async fn is_limited(&self, author_id: UserId) -> Result<bool, ApplicationError> {
        let key = Self::key_for(author_id);
        bounded(
            "rate_limit",
            self.call_timeout,
            self.store
                .increment_and_check(&key, self.policy.limit, self.policy.window),
        )
        .await
    }

    /// 归还已占用的名额。失败只记录日志，最坏情况是本窗口少一个名额
    pub async fn release(&self, author_id: UserId) {
        let key = Self::key_for(author_id);
        if let Err(err) = bounded("rate_limit_release", self.call_timeout, self.store.release(&key)).await {
            tracing::warn!(author_id = %author_id, error = %err, "failed to release rate limit slot");
        }
    }

    pub fn rejection(&self) -> ApplicationError {
        ApplicationError::RateLimited {
            limit: self.policy.limit,
            window_seconds: self.policy.window.as_secs(),
        }
    }
}
