use application::{ApplicationError, CreateQuestionRequest, QUESTION_ERROR, QUESTION_RESYNC};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{QuestionId, SessionId};
use futures_util::{SinkExt, StreamExt};
use infrastructure::{RoomDelivery, RoomSubscription};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::Identity;
use crate::state::AppState;

const QUESTION_CREATE: &str = "question:create";
const QUESTION_UPVOTE: &str = "question:upvote";
const QUESTION_RESOLVE: &str = "question:resolve";

/// 客户端发来的事件
#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// 推送给客户端的事件
#[derive(Debug, Serialize)]
struct OutboundEnvelope<'a> {
    event: &'a str,
    data: &'a Value,
}

/// WebSocket 写操作命令
#[derive(Debug)]
enum WsCommand {
    SendText(String),
    SendPong(Vec<u8>),
}

/// 单个 WebSocket 连接
///
/// 连接建立时已加入会话房间（讲师还会加入讲师房间），
/// 房间事件原样转发；客户端事件交给应用层处理，失败只回给发送方。
pub struct WebSocketConnection {
    state: AppState,
    identity: Identity,
    session_id: SessionId,
    subscription: RoomSubscription,
}

impl WebSocketConnection {
    pub fn new(
        state: AppState,
        identity: Identity,
        session_id: SessionId,
        subscription: RoomSubscription,
    ) -> Self {
        Self {
            state,
            identity,
            session_id,
            subscription,
        }
    }

    pub async fn run(self, socket: WebSocket) {
        let Self {
            state,
            identity,
            session_id,
            mut subscription,
        } = self;

        tracing::info!(user_id = %identity.user_id, session_id = %session_id, role = ?identity.role, "websocket connected");

        let (mut sender, mut incoming) = socket.split();
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

        // 发送任务：所有写操作都经过这里
        let mut send_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(cmd) = cmd_rx.recv() => {
                        let message = match cmd {
                            WsCommand::SendText(text) => WsMessage::Text(text.into()),
                            WsCommand::SendPong(data) => WsMessage::Pong(data.into()),
                        };
                        if sender.send(message).await.is_err() {
                            tracing::debug!("websocket send failed");
                            break;
                        }
                    }
                    delivery = subscription.recv() => {
                        let text = match delivery {
                            Some(RoomDelivery::Event(event)) => serde_json::to_string(&OutboundEnvelope {
                                event: &event.event,
                                data: &event.payload,
                            }),
                            Some(RoomDelivery::Lagged { skipped }) => {
                                Ok(resync_event(session_id, skipped))
                            }
                            None => break,
                        };
                        let text = match text {
                            Ok(text) => text,
                            Err(err) => {
                                tracing::warn!(error = %err, "failed to serialize room event");
                                continue;
                            }
                        };
                        if sender.send(WsMessage::Text(text.into())).await.is_err() {
                            tracing::debug!("websocket send failed");
                            break;
                        }
                    }
                    else => break,
                }
            }
        });

        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = incoming.next().await {
                match message {
                    WsMessage::Close(_) => break,
                    WsMessage::Ping(data) => {
                        if cmd_tx.send(WsCommand::SendPong(data.to_vec())).await.is_err() {
                            break;
                        }
                    }
                    WsMessage::Pong(_) => {}
                    WsMessage::Text(text) => {
                        if let Err(err) =
                            handle_event(&state, identity, session_id, text.as_str()).await
                        {
                            if cmd_tx.send(WsCommand::SendText(error_event(&err))).await.is_err() {
                                break;
                            }
                        }
                    }
                    WsMessage::Binary(_) => {
                        let err = ApplicationError::malformed("binary frames are not supported");
                        if cmd_tx.send(WsCommand::SendText(error_event(&err))).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // 任一方向结束就关闭整个连接；已提交的提问在独立任务里继续完成
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        tracing::info!(user_id = %identity.user_id, session_id = %session_id, "websocket disconnected");
    }
}

/// 成功时不直接回复，发送方作为房间成员会收到广播
async fn handle_event(
    state: &AppState,
    identity: Identity,
    session_id: SessionId,
    text: &str,
) -> Result<(), ApplicationError> {
    let envelope: InboundEnvelope = serde_json::from_str(text)
        .map_err(|_| ApplicationError::malformed("message must be an {event, data} envelope"))?;

    match envelope.event.as_str() {
        QUESTION_CREATE => {
            let mut payload = envelope.data;
            // 负载里没带 sessionId 时使用连接所在的会话
            if let Some(object) = payload.as_object_mut() {
                object
                    .entry("sessionId")
                    .or_insert_with(|| json!(session_id.to_string()));
            }

            state
                .intake_service
                .submit(CreateQuestionRequest {
                    author_id: Some(identity.user_id),
                    session_id: None,
                    payload,
                })
                .await?;
        }
        QUESTION_UPVOTE => {
            let question_id = question_id_field(&envelope.data)?;
            state
                .moderation_service
                .upvote(Some(identity.user_id), question_id)
                .await?;
        }
        QUESTION_RESOLVE => {
            let question_id = question_id_field(&envelope.data)?;
            let status = envelope
                .data
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("RESOLVED");
            state
                .moderation_service
                .change_status(Some(identity.user_id), question_id, Some(status))
                .await?;
        }
        other => {
            return Err(ApplicationError::malformed(format!("unknown event {other}")));
        }
    }

    Ok(())
}

fn question_id_field(data: &Value) -> Result<QuestionId, ApplicationError> {
    data.get("questionId")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .map(QuestionId::from)
        .ok_or_else(|| ApplicationError::malformed("questionId must be a UUID"))
}

fn error_event(err: &ApplicationError) -> String {
    let data = json!({
        "code": err.code(),
        "message": err.public_message(),
        "retryable": err.is_retryable(),
    });
    json!({ "event": QUESTION_ERROR, "data": data }).to_string()
}

/// 丢失事件后提示客户端重新拉取列表
fn resync_event(session_id: SessionId, skipped: u64) -> String {
    json!({
        "event": QUESTION_RESYNC,
        "data": { "sessionId": session_id.to_string(), "skipped": skipped },
    })
    .to_string()
}
