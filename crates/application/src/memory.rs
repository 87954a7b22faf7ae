//! 内存版协作方实现
//!
//! 单进程开发模式和测试使用，行为与 PostgreSQL / Redis 实现保持一致。

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use domain::{
    ListedQuestion, Question, QuestionFilter, QuestionId, QuestionStatus, RepositoryError, Room,
    Session, SessionId,
};
use tokio::sync::RwLock;

use crate::broadcaster::{BroadcastError, RealtimeTransport, RoomEvent};
use crate::rate_limiter::{CounterStore, CounterStoreError};
use crate::repository::{QuestionRepository, SessionRepository};

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) {
        self.sessions.write().await.insert(session.id, session);
    }

    pub async fn set_submissions_enabled(&self, id: SessionId, enabled: bool) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            if enabled {
                session.enable_submissions();
            } else {
                session.disable_submissions();
            }
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, RepositoryError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    questions: RwLock<HashMap<QuestionId, Question>>,
    answer_counts: RwLock<HashMap<QuestionId, u32>>,
}

impl InMemoryQuestionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 回答由外部流程写入，这里只提供计数入口
    pub async fn record_answers(&self, question_id: QuestionId, count: u32) {
        self.answer_counts.write().await.insert(question_id, count);
    }

    /// 存储中的原始记录，包括匿名提问的作者
    pub async fn stored(&self) -> Vec<Question> {
        let mut questions: Vec<Question> = self.questions.read().await.values().cloned().collect();
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        questions
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn create(&self, question: Question) -> Result<Question, RepositoryError> {
        let mut questions = self.questions.write().await;
        if questions.contains_key(&question.id) {
            return Err(RepositoryError::Conflict);
        }
        questions.insert(question.id, question.clone());
        Ok(question)
    }

    async fn find_by_id(&self, id: QuestionId) -> Result<Option<Question>, RepositoryError> {
        Ok(self.questions.read().await.get(&id).cloned())
    }

    async fn list_by_session(
        &self,
        session_id: SessionId,
        filter: QuestionFilter,
    ) -> Result<Vec<ListedQuestion>, RepositoryError> {
        let questions = self.questions.read().await;
        let answers = self.answer_counts.read().await;

        let mut listed: Vec<ListedQuestion> = questions
            .values()
            .filter(|question| question.session_id == session_id && filter.matches(question))
            .map(|question| ListedQuestion {
                question: question.clone(),
                answer_count: answers.get(&question.id).copied().unwrap_or(0),
            })
            .collect();
        listed.sort_by(|a, b| b.question.created_at.cmp(&a.question.created_at));
        Ok(listed)
    }

    async fn increment_upvotes(&self, id: QuestionId) -> Result<Option<Question>, RepositoryError> {
        let mut questions = self.questions.write().await;
        Ok(questions.get_mut(&id).map(|question| {
            question.upvote_count += 1;
            question.clone()
        }))
    }

    async fn update_status(
        &self,
        id: QuestionId,
        expected: QuestionStatus,
        next: QuestionStatus,
    ) -> Result<Option<Question>, RepositoryError> {
        let mut questions = self.questions.write().await;
        let Some(question) = questions.get_mut(&id) else {
            return Ok(None);
        };
        if question.status != expected {
            return Err(RepositoryError::Conflict);
        }
        question.status = next;
        Ok(Some(question.clone()))
    }
}

/// 单个键的计数窗口
#[derive(Debug, Clone)]
struct CounterWindow {
    count: u32,
    window_start: Instant,
    window: Duration,
}

impl CounterWindow {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
            window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.window_start) >= self.window
    }
}

/// 固定窗口计数器，过期后整窗重置，与 Redis 键过期的效果一致
#[derive(Default)]
pub struct InMemoryCounterStore {
    windows: Mutex<HashMap<String, CounterWindow>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前窗口内的计数，窗口已过期视为 0
    pub fn count(&self, key: &str) -> u32 {
        let Ok(windows) = self.windows.lock() else {
            return 0;
        };
        windows
            .get(key)
            .filter(|window| !window.is_expired(Instant::now()))
            .map(|window| window.count)
            .unwrap_or(0)
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment_and_check(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<bool, CounterStoreError> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| CounterStoreError::Unavailable("counter lock poisoned".to_string()))?;

        let now = Instant::now();
        let entry = windows
            .entry(key.to_owned())
            .or_insert_with(|| CounterWindow::new(window));

        if entry.is_expired(now) {
            *entry = CounterWindow::new(window);
        }

        if entry.count >= limit {
            return Ok(true);
        }

        entry.count += 1;
        Ok(false)
    }

    async fn release(&self, key: &str) -> Result<(), CounterStoreError> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| CounterStoreError::Unavailable("counter lock poisoned".to_string()))?;

        if let Some(entry) = windows.get_mut(key) {
            entry.count = entry.count.saturating_sub(1);
        }
        Ok(())
    }
}

/// 记录所有发布事件的传输层，可切换成总是失败
#[derive(Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<RoomEvent>>,
    failing: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn events(&self) -> Vec<RoomEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RealtimeTransport for RecordingTransport {
    async fn publish(
        &self,
        room: &Room,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), BroadcastError> {
        if self.failing {
            return Err(BroadcastError::failed("transport unavailable"));
        }
        self.events
            .lock()
            .map_err(|_| BroadcastError::failed("event log poisoned"))?
            .push(RoomEvent::new(room, event, payload));
        Ok(())
    }
}
