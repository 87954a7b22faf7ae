use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{Question, Room};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deadline::bounded;
use crate::dto::QuestionView;

pub const QUESTION_CREATED: &str = "question:created";
pub const QUESTION_UPVOTED: &str = "question:upvoted";
pub const QUESTION_UPDATED: &str = "question:updated";
pub const QUESTION_ERROR: &str = "question:error";
/// 连接丢失了部分房间事件，客户端应通过列表接口重新拉取
pub const QUESTION_RESYNC: &str = "question:resync";

/// 投递到某个房间的一条实时事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomEvent {
    pub room: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl RoomEvent {
    pub fn new(room: &Room, event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            room: room.to_string(),
            event: event.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 按房间发布事件。房间成员关系由传输层自己维护
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn publish(
        &self,
        room: &Room,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), BroadcastError>;
}

/// 把提问投递到可见性对应的房间，负载总是脱敏后的视图
pub struct QuestionBroadcaster {
    transport: Arc<dyn RealtimeTransport>,
    call_timeout: Duration,
}

impl QuestionBroadcaster {
    pub fn new(transport: Arc<dyn RealtimeTransport>, call_timeout: Duration) -> Self {
        Self {
            transport,
            call_timeout,
        }
    }

    /// 发布失败只记录告警，返回是否投递成功
    pub async fn publish(&self, event: &'static str, question: &Question) -> bool {
        let room = question.room();
        let payload = match serde_json::to_value(QuestionView::from(question)) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(question_id = %question.id, error = %err, "failed to encode question payload");
                return false;
            }
        };

        match bounded(
            "broadcast",
            self.call_timeout,
            self.transport.publish(&room, event, payload),
        )
        .await
        {
            Ok(()) => {
                tracing::debug!(question_id = %question.id, room = %room, event, "question published");
                true
            }
            Err(err) => {
                tracing::warn!(
                    question_id = %question.id,
                    room = %room,
                    event,
                    error = %err,
                    "failed to publish question event"
                );
                false
            }
        }
    }
}
