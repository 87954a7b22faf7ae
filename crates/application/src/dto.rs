use domain::{
    ListedQuestion, Question, QuestionId, QuestionStatus, SessionId, SlideId, Timestamp, UserId,
    Visibility,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApplicationError;

/// 对外的提问视图。匿名提问的 `authorId` 固定为 null，
/// 广播、创建响应与列表查询都只通过这里输出提问
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: QuestionId,
    pub session_id: SessionId,
    pub author_id: Option<UserId>,
    pub content: String,
    pub visibility: Visibility,
    pub status: QuestionStatus,
    pub is_anonymous: bool,
    pub upvote_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_count: Option<u32>,
    pub slide_id: Option<SlideId>,
    pub created_at: Timestamp,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            session_id: question.session_id,
            author_id: question.public_author(),
            content: question.content.as_str().to_owned(),
            visibility: question.visibility,
            status: question.status,
            is_anonymous: question.is_anonymous,
            upvote_count: question.upvote_count,
            answer_count: None,
            slide_id: question.slide_id.clone(),
            created_at: question.created_at,
        }
    }
}

impl From<&ListedQuestion> for QuestionView {
    fn from(listed: &ListedQuestion) -> Self {
        Self {
            answer_count: Some(listed.answer_count),
            ..Self::from(&listed.question)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListing {
    pub session_id: SessionId,
    pub questions: Vec<QuestionView>,
    pub count: usize,
}

/// 入口传来的提问负载，只做类型层面的检查，业务校验交给 validator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionPayload {
    pub session_id: Option<SessionId>,
    /// 缺失或不是字符串时为 None
    pub content: Option<String>,
    /// 非字符串的值会以 JSON 文本保留，由可见性校验拒绝
    pub visibility: Option<String>,
    pub is_anonymous: bool,
    pub slide_id: Option<SlideId>,
}

impl QuestionPayload {
    pub fn from_json(value: &Value) -> Result<Self, ApplicationError> {
        let object = value
            .as_object()
            .ok_or_else(|| ApplicationError::malformed("payload must be a JSON object"))?;

        Ok(Self {
            session_id: session_id_field(object)?,
            content: object
                .get("content")
                .and_then(Value::as_str)
                .map(str::to_owned),
            visibility: match object.get("visibility") {
                None | Some(Value::Null) => None,
                Some(Value::String(raw)) if raw.is_empty() => None,
                Some(Value::String(raw)) => Some(raw.clone()),
                Some(other) => Some(other.to_string()),
            },
            is_anonymous: match object.get("isAnonymous") {
                None | Some(Value::Null) => false,
                Some(Value::Bool(flag)) => *flag,
                Some(_) => return Err(ApplicationError::malformed("isAnonymous must be a boolean")),
            },
            slide_id: match object.get("slideId") {
                None | Some(Value::Null) => None,
                Some(Value::String(raw)) => Some(SlideId::new(raw.clone())),
                Some(_) => return Err(ApplicationError::malformed("slideId must be a string")),
            },
        })
    }
}

fn session_id_field(object: &Map<String, Value>) -> Result<Option<SessionId>, ApplicationError> {
    match object.get("sessionId") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => Uuid::parse_str(raw)
            .map(|id| Some(SessionId::from(id)))
            .map_err(|_| ApplicationError::malformed("sessionId must be a UUID")),
        Some(_) => Err(ApplicationError::malformed("sessionId must be a string")),
    }
}

/// 从 JSON 负载里取出可选的用户标识，例如 HTTP 请求体中的 `authorId`
pub fn identity_field(value: &Value, field: &str) -> Result<Option<UserId>, ApplicationError> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => Uuid::parse_str(raw)
            .map(|id| Some(UserId::from(id)))
            .map_err(|_| ApplicationError::malformed(format!("{field} must be a UUID"))),
        Some(_) => Err(ApplicationError::malformed(format!("{field} must be a string"))),
    }
}
