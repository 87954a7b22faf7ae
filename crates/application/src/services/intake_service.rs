use std::sync::Arc;
use std::time::Duration;

use domain::{Question, QuestionId, SessionId, UserId};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    broadcaster::{QuestionBroadcaster, RealtimeTransport, QUESTION_CREATED},
    clock::Clock,
    dto::QuestionPayload,
    error::ApplicationError,
    gatekeeper::SessionGatekeeper,
    rate_limiter::{CounterStore, QuestionRateLimiter, RateLimitPolicy},
    repository::{QuestionRepository, SessionRepository},
    validator::{validate_content, validate_visibility},
};

/// 一次提问提交。HTTP 从路径带入 `session_id`，WebSocket 从负载里取
#[derive(Debug, Clone)]
pub struct CreateQuestionRequest {
    pub author_id: Option<UserId>,
    pub session_id: Option<SessionId>,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy)]
pub struct IntakePolicy {
    pub rate_limit: RateLimitPolicy,
    pub call_timeout: Duration,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitPolicy::default(),
            call_timeout: Duration::from_millis(2000),
        }
    }
}

impl From<&config::IntakeConfig> for IntakePolicy {
    fn from(config: &config::IntakeConfig) -> Self {
        Self {
            rate_limit: RateLimitPolicy {
                limit: config.rate_limit_count,
                window: config.rate_limit_window(),
            },
            call_timeout: config.external_call_timeout(),
        }
    }
}

pub struct IntakeServiceDependencies {
    pub session_repository: Arc<dyn SessionRepository>,
    pub question_repository: Arc<dyn QuestionRepository>,
    pub counter_store: Arc<dyn CounterStore>,
    pub transport: Arc<dyn RealtimeTransport>,
    pub clock: Arc<dyn Clock>,
    pub policy: IntakePolicy,
}

/// 提问接收流水线：身份、负载、内容、可见性、限流、会话、持久化、广播，
/// 任一步失败立即返回
pub struct QuestionIntakeService {
    question_repository: Arc<dyn QuestionRepository>,
    rate_limiter: QuestionRateLimiter,
    gatekeeper: SessionGatekeeper,
    broadcaster: QuestionBroadcaster,
    clock: Arc<dyn Clock>,
    call_timeout: Duration,
}

impl QuestionIntakeService {
    pub fn new(deps: IntakeServiceDependencies) -> Self {
        let call_timeout = deps.policy.call_timeout;
        Self {
            question_repository: deps.question_repository,
            rate_limiter: QuestionRateLimiter::new(
                deps.counter_store,
                deps.policy.rate_limit,
                call_timeout,
            ),
            gatekeeper: SessionGatekeeper::new(deps.session_repository, call_timeout),
            broadcaster: QuestionBroadcaster::new(deps.transport, call_timeout),
            clock: deps.clock,
            call_timeout,
        }
    }

    /// 在独立任务里执行流水线并等待结果。调用方被取消时，已持久化的提问仍会广播
    pub async fn submit(
        self: &Arc<Self>,
        request: CreateQuestionRequest,
    ) -> Result<Question, ApplicationError> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.create_question(request).await })
            .await
            .map_err(|err| ApplicationError::internal(format!("intake task failed: {err}")))?
    }

    pub async fn create_question(
        &self,
        request: CreateQuestionRequest,
    ) -> Result<Question, ApplicationError> {
        let author_id = request.author_id;
        let result = self.run(request).await;

        match &result {
            Ok(question) => tracing::info!(
                question_id = %question.id,
                session_id = %question.session_id,
                visibility = %question.visibility,
                "question created"
            ),
            Err(err @ (ApplicationError::Transient { .. } | ApplicationError::Internal(_))) => {
                tracing::error!(author_id = ?author_id, code = err.code(), error = %err, "question intake failed")
            }
            Err(err) => {
                tracing::debug!(author_id = ?author_id, code = err.code(), "question rejected")
            }
        }

        result
    }

    async fn run(&self, request: CreateQuestionRequest) -> Result<Question, ApplicationError> {
        let author_id = request
            .author_id
            .ok_or(ApplicationError::AuthenticationRequired)?;

        let payload = QuestionPayload::from_json(&request.payload)?;
        let session_id = request
            .session_id
            .or(payload.session_id)
            .ok_or_else(|| ApplicationError::malformed("sessionId is required"))?;

        let content = validate_content(payload.content.as_deref())?;
        let visibility = validate_visibility(payload.visibility.as_deref())?.unwrap_or_default();

        if self.rate_limiter.is_limited(author_id).await? {
            return Err(self.rate_limiter.rejection());
        }

        // 会话检查失败或写入明确失败时归还刚占用的名额
        let admission = self
            .gatekeeper
            .check_submittable(session_id)
            .await
            .and_then(|admission| admission.into_result());
        if let Err(err) = admission {
            self.rate_limiter.release(author_id).await;
            return Err(err);
        }

        let question = Question::open(
            QuestionId::from(Uuid::new_v4()),
            session_id,
            author_id,
            content,
            visibility,
            payload.is_anonymous,
            payload.slide_id,
            self.clock.now(),
        );

        let question = match tokio::time::timeout(
            self.call_timeout,
            self.question_repository.create(question),
        )
        .await
        {
            Ok(Ok(question)) => question,
            Ok(Err(err)) => {
                self.rate_limiter.release(author_id).await;
                return Err(ApplicationError::from(err).in_operation("persist"));
            }
            // 超时的写入可能已经提交，名额继续占用
            Err(_) => {
                tracing::warn!(author_id = %author_id, session_id = %session_id, "persist timed out, outcome unknown");
                return Err(ApplicationError::transient(
                    "persist",
                    format!("timed out after {}ms", self.call_timeout.as_millis()),
                ));
            }
        };

        self.broadcaster.publish(QUESTION_CREATED, &question).await;
        Ok(question)
    }
}
