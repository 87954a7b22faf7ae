use async_trait::async_trait;
use domain::{
    ListedQuestion, Question, QuestionFilter, QuestionId, QuestionStatus, RepositoryError,
    Session, SessionId,
};

/// 会话只读访问
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    // 写入新提问，返回存储后的记录
    async fn create(&self, question: Question) -> Result<Question, RepositoryError>;

    async fn find_by_id(&self, id: QuestionId) -> Result<Option<Question>, RepositoryError>;

    // 按创建时间倒序，附带回答数量
    async fn list_by_session(
        &self,
        session_id: SessionId,
        filter: QuestionFilter,
    ) -> Result<Vec<ListedQuestion>, RepositoryError>;

    // 原子地加一，问题不存在时返回 None
    async fn increment_upvotes(&self, id: QuestionId) -> Result<Option<Question>, RepositoryError>;

    // 仅当当前状态仍为 expected 时写入；状态已被改动返回 Conflict，问题不存在返回 None
    async fn update_status(
        &self,
        id: QuestionId,
        expected: QuestionStatus,
        next: QuestionStatus,
    ) -> Result<Option<Question>, RepositoryError>;
}
