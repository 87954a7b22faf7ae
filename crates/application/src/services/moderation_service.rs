use std::sync::Arc;
use std::time::Duration;

use domain::{Question, QuestionId, RepositoryError, UserId};

use crate::{
    broadcaster::{QuestionBroadcaster, RealtimeTransport, QUESTION_UPDATED, QUESTION_UPVOTED},
    deadline::bounded,
    error::ApplicationError,
    repository::QuestionRepository,
    validator::validate_status,
};

const STATUS_WRITE_ATTEMPTS: usize = 3;

pub struct ModerationServiceDependencies {
    pub question_repository: Arc<dyn QuestionRepository>,
    pub transport: Arc<dyn RealtimeTransport>,
    pub call_timeout: Duration,
}

/// 点赞与状态流转。结果同样以脱敏视图广播到提问所在的房间
pub struct QuestionModerationService {
    question_repository: Arc<dyn QuestionRepository>,
    broadcaster: QuestionBroadcaster,
    call_timeout: Duration,
}

impl QuestionModerationService {
    pub fn new(deps: ModerationServiceDependencies) -> Self {
        Self {
            question_repository: deps.question_repository,
            broadcaster: QuestionBroadcaster::new(deps.transport, deps.call_timeout),
            call_timeout: deps.call_timeout,
        }
    }

    pub async fn upvote(
        &self,
        actor_id: Option<UserId>,
        question_id: QuestionId,
    ) -> Result<Question, ApplicationError> {
        let actor_id = actor_id.ok_or(ApplicationError::AuthenticationRequired)?;

        let question = bounded(
            "upvote",
            self.call_timeout,
            self.question_repository.increment_upvotes(question_id),
        )
        .await?
        .ok_or(ApplicationError::QuestionNotFound)?;

        tracing::debug!(question_id = %question.id, actor_id = %actor_id, upvotes = question.upvote_count, "question upvoted");
        self.broadcaster.publish(QUESTION_UPVOTED, &question).await;
        Ok(question)
    }

    pub async fn change_status(
        &self,
        actor_id: Option<UserId>,
        question_id: QuestionId,
        status: Option<&str>,
    ) -> Result<Question, ApplicationError> {
        let actor_id = actor_id.ok_or(ApplicationError::AuthenticationRequired)?;
        let next = validate_status(status)?;

        // 状态只会前进，冲突后重读最多再遇到两次冲突
        for _ in 0..STATUS_WRITE_ATTEMPTS {
            let mut question = bounded(
                "question_lookup",
                self.call_timeout,
                self.question_repository.find_by_id(question_id),
            )
            .await?
            .ok_or(ApplicationError::QuestionNotFound)?;

            let expected = question.status;
            question.transition_to(next)?;

            let written = bounded("update_status", self.call_timeout, async {
                Ok::<_, ApplicationError>(
                    self.question_repository
                        .update_status(question_id, expected, next)
                        .await,
                )
            })
            .await?;

            match written {
                Ok(Some(question)) => {
                    tracing::debug!(question_id = %question.id, actor_id = %actor_id, status = %question.status, "question status changed");
                    self.broadcaster.publish(QUESTION_UPDATED, &question).await;
                    return Ok(question);
                }
                Ok(None) => return Err(ApplicationError::QuestionNotFound),
                Err(RepositoryError::Conflict) => {
                    tracing::debug!(question_id = %question_id, expected = %expected, "status changed concurrently, re-reading");
                }
                Err(err) => return Err(ApplicationError::from(err).in_operation("update_status")),
            }
        }

        Err(ApplicationError::internal(
            "question status kept changing during update",
        ))
    }
}
