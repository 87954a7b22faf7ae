use std::sync::Arc;

use application::{QuestionIntakeService, QuestionModerationService, QuestionQueryService};
use infrastructure::LocalRoomTransport;

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub intake_service: Arc<QuestionIntakeService>,
    pub query_service: Arc<QuestionQueryService>,
    pub moderation_service: Arc<QuestionModerationService>,
    /// WebSocket 连接从这里订阅房间事件
    pub rooms: LocalRoomTransport,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        intake_service: Arc<QuestionIntakeService>,
        query_service: Arc<QuestionQueryService>,
        moderation_service: Arc<QuestionModerationService>,
        rooms: LocalRoomTransport,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            intake_service,
            query_service,
            moderation_service,
            rooms,
            jwt_service,
        }
    }
}
