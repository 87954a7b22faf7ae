use std::sync::Arc;

use application::repository::{QuestionRepository, SessionRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    CourseId, ListedQuestion, Question, QuestionContent, QuestionFilter, QuestionId,
    QuestionStatus, RepositoryError, Session, SessionId, SlideId, UserId, Visibility,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::PoolTimedOut => RepositoryError::timeout("acquire connection"),
        sqlx::Error::PoolClosed => RepositoryError::unavailable("connection pool closed"),
        sqlx::Error::Io(io) => RepositoryError::unavailable(io.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
        other => RepositoryError::storage(other.to_string()),
    }
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct SessionRecord {
    id: Uuid,
    course_id: Uuid,
    title: String,
    is_submissions_enabled: bool,
    created_at: DateTime<Utc>,
}

impl From<SessionRecord> for Session {
    fn from(value: SessionRecord) -> Self {
        Session {
            id: SessionId::from(value.id),
            course_id: CourseId::from(value.course_id),
            title: value.title,
            is_submissions_enabled: value.is_submissions_enabled,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct QuestionRecord {
    id: Uuid,
    session_id: Uuid,
    author_id: Uuid,
    content: String,
    visibility: String,
    is_anonymous: bool,
    status: String,
    upvote_count: i32,
    slide_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = RepositoryError;

    fn try_from(value: QuestionRecord) -> Result<Self, Self::Error> {
        let content =
            QuestionContent::parse(&value.content).map_err(|err| invalid_data(err.to_string()))?;
        let visibility = value
            .visibility
            .parse::<Visibility>()
            .map_err(|err| invalid_data(err.to_string()))?;
        let status = value
            .status
            .parse::<QuestionStatus>()
            .map_err(|err| invalid_data(err.to_string()))?;
        let upvote_count = u32::try_from(value.upvote_count)
            .map_err(|_| invalid_data(format!("negative upvote count {}", value.upvote_count)))?;

        Ok(Question {
            id: QuestionId::from(value.id),
            session_id: SessionId::from(value.session_id),
            author_id: UserId::from(value.author_id),
            content,
            visibility,
            is_anonymous: value.is_anonymous,
            status,
            upvote_count,
            slide_id: value.slide_id.map(SlideId::new),
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ListedQuestionRecord {
    #[sqlx(flatten)]
    question: QuestionRecord,
    answer_count: i64,
}

impl TryFrom<ListedQuestionRecord> for ListedQuestion {
    type Error = RepositoryError;

    fn try_from(value: ListedQuestionRecord) -> Result<Self, Self::Error> {
        Ok(ListedQuestion {
            question: Question::try_from(value.question)?,
            answer_count: u32::try_from(value.answer_count).unwrap_or(u32::MAX),
        })
    }
}

const QUESTION_COLUMNS: &str = "id, session_id, author_id, content, visibility, is_anonymous, \
     status, upvote_count, slide_id, created_at";

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 会话由课程管理流程创建，这里只用于初始化数据和测试
    pub async fn insert(&self, session: &Session) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, course_id, title, is_submissions_enabled, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::from(session.id))
        .bind(Uuid::from(session.course_id))
        .bind(&session.title)
        .bind(session.is_submissions_enabled)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn set_submissions_enabled(
        &self,
        id: SessionId,
        enabled: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE sessions SET is_submissions_enabled = $2 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(enabled)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, RepositoryError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT id, course_id, title, is_submissions_enabled, created_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Session::from))
    }
}

#[derive(Clone)]
pub struct PgQuestionRepository {
    pool: PgPool,
}

impl PgQuestionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionRepository for PgQuestionRepository {
    async fn create(&self, question: Question) -> Result<Question, RepositoryError> {
        let record = sqlx::query_as::<_, QuestionRecord>(&format!(
            r#"
            INSERT INTO questions ({QUESTION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(Uuid::from(question.id))
        .bind(Uuid::from(question.session_id))
        .bind(Uuid::from(question.author_id))
        .bind(question.content.as_str())
        .bind(question.visibility.as_str())
        .bind(question.is_anonymous)
        .bind(question.status.as_str())
        .bind(question.upvote_count as i32)
        .bind(question.slide_id.as_ref().map(SlideId::as_str))
        .bind(question.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Question::try_from(record)
    }

    async fn find_by_id(&self, id: QuestionId) -> Result<Option<Question>, RepositoryError> {
        let record = sqlx::query_as::<_, QuestionRecord>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Question::try_from).transpose()
    }

    async fn list_by_session(
        &self,
        session_id: SessionId,
        filter: QuestionFilter,
    ) -> Result<Vec<ListedQuestion>, RepositoryError> {
        let records = sqlx::query_as::<_, ListedQuestionRecord>(
            r#"
            SELECT q.id, q.session_id, q.author_id, q.content, q.visibility, q.is_anonymous,
                   q.status, q.upvote_count, q.slide_id, q.created_at,
                   COUNT(a.id) AS answer_count
            FROM questions q
            LEFT JOIN answers a ON a.question_id = q.id
            WHERE q.session_id = $1
              AND ($2::TEXT IS NULL OR q.visibility = $2)
              AND ($3::TEXT IS NULL OR q.status = $3)
            GROUP BY q.id
            ORDER BY q.created_at DESC
            "#,
        )
        .bind(Uuid::from(session_id))
        .bind(filter.visibility.map(|v| v.as_str()))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(ListedQuestion::try_from).collect()
    }

    async fn increment_upvotes(&self, id: QuestionId) -> Result<Option<Question>, RepositoryError> {
        let record = sqlx::query_as::<_, QuestionRecord>(&format!(
            r#"
            UPDATE questions SET upvote_count = upvote_count + 1
            WHERE id = $1
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Question::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: QuestionId,
        expected: QuestionStatus,
        next: QuestionStatus,
    ) -> Result<Option<Question>, RepositoryError> {
        let record = sqlx::query_as::<_, QuestionRecord>(&format!(
            r#"
            UPDATE questions SET status = $2
            WHERE id = $1 AND status = $3
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(Uuid::from(id))
        .bind(next.as_str())
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if let Some(record) = record {
            return Question::try_from(record).map(Some);
        }

        // 没有命中：要么问题不存在，要么状态已被其他请求改动
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM questions WHERE id = $1)")
                .bind(Uuid::from(id))
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        if exists {
            Err(RepositoryError::Conflict)
        } else {
            Ok(None)
        }
    }
}

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub session_repository: Arc<PgSessionRepository>,
    pub question_repository: Arc<PgQuestionRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            session_repository: Arc::new(PgSessionRepository::new(pool.clone())),
            question_repository: Arc::new(PgQuestionRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
