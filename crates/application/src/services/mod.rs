mod intake_service;
mod moderation_service;
mod query_service;

pub use intake_service::{
    CreateQuestionRequest, IntakePolicy, IntakeServiceDependencies, QuestionIntakeService,
};
pub use moderation_service::{ModerationServiceDependencies, QuestionModerationService};
pub use query_service::{ListQuestionsQuery, QueryServiceDependencies, QuestionQueryService};
