//! 应用层实现。
//!
//! 这里提供围绕提问模型的用例服务：输入校验、限流、会话准入、
//! 持久化与按房间广播，以及对外部协作方（存储、计数器、实时传输）的抽象。

pub mod broadcaster;
pub mod clock;
pub mod deadline;
pub mod dto;
pub mod error;
pub mod gatekeeper;
pub mod memory;
pub mod rate_limiter;
pub mod repository;
pub mod services;
pub mod validator;

pub use broadcaster::{
    BroadcastError, QuestionBroadcaster, RealtimeTransport, RoomEvent, QUESTION_CREATED,
    QUESTION_ERROR, QUESTION_RESYNC, QUESTION_UPDATED, QUESTION_UPVOTED,
};
pub use clock::{Clock, SystemClock};
pub use dto::{QuestionListing, QuestionPayload, QuestionView};
pub use error::ApplicationError;
pub use gatekeeper::{SessionAdmission, SessionGatekeeper};
pub use rate_limiter::{CounterStore, CounterStoreError, QuestionRateLimiter, RateLimitPolicy};
pub use repository::{QuestionRepository, SessionRepository};
pub use services::{
    CreateQuestionRequest, IntakePolicy, IntakeServiceDependencies, ListQuestionsQuery,
    ModerationServiceDependencies, QueryServiceDependencies, QuestionIntakeService,
    QuestionModerationService, QuestionQueryService,
};
pub use validator::ValidationError;
