use std::sync::Arc;
use std::time::Duration;

use domain::{QuestionFilter, QuestionStatus, SessionId, Visibility};

use crate::{
    deadline::bounded,
    dto::{QuestionListing, QuestionView},
    error::ApplicationError,
    repository::{QuestionRepository, SessionRepository},
};

/// 列表查询参数，原样保留调用方传入的字符串
#[derive(Debug, Clone, Default)]
pub struct ListQuestionsQuery {
    pub visibility: Option<String>,
    pub status: Option<String>,
}

impl ListQuestionsQuery {
    /// 无法识别的取值直接忽略，不作为过滤条件
    pub fn filter(&self) -> QuestionFilter {
        QuestionFilter {
            visibility: self
                .visibility
                .as_deref()
                .and_then(|raw| raw.parse::<Visibility>().ok()),
            status: self
                .status
                .as_deref()
                .and_then(|raw| raw.parse::<QuestionStatus>().ok()),
        }
    }
}

pub struct QueryServiceDependencies {
    pub session_repository: Arc<dyn SessionRepository>,
    pub question_repository: Arc<dyn QuestionRepository>,
    pub call_timeout: Duration,
}

pub struct QuestionQueryService {
    deps: QueryServiceDependencies,
}

impl QuestionQueryService {
    pub fn new(deps: QueryServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn list_questions(
        &self,
        session_id: SessionId,
        query: ListQuestionsQuery,
    ) -> Result<QuestionListing, ApplicationError> {
        let session = bounded(
            "session_lookup",
            self.deps.call_timeout,
            self.deps.session_repository.find_by_id(session_id),
        )
        .await?;
        if session.is_none() {
            return Err(ApplicationError::SessionNotFound);
        }

        let listed = bounded(
            "list_questions",
            self.deps.call_timeout,
            self.deps
                .question_repository
                .list_by_session(session_id, query.filter()),
        )
        .await?;

        let questions: Vec<QuestionView> = listed.iter().map(QuestionView::from).collect();
        Ok(QuestionListing {
            session_id,
            count: questions.len(),
            questions,
        })
    }
}
