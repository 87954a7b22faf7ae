use axum::{
    body::Bytes,
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use application::{
    dto::identity_field, ApplicationError, CreateQuestionRequest, ListQuestionsQuery,
    QuestionListing, QuestionView,
};
use domain::{QuestionId, Room, SessionId, UserId};

use crate::{
    auth::Role,
    error::ApiError,
    state::AppState,
    ws_connection::WebSocketConnection,
};

#[derive(Debug, Deserialize)]
struct ListQuery {
    visibility: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsQuery {
    token: Option<String>,
    session_id: Uuid,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions/{session_id}/questions",
            post(create_question).get(list_questions),
        )
        .route("/questions/{question_id}/upvote", post(upvote_question))
        .route("/questions/{question_id}/status", patch(change_status))
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

fn parse_body(body: &Bytes) -> Result<Value, ApplicationError> {
    serde_json::from_slice(body).map_err(|_| ApplicationError::malformed("body must be valid JSON"))
}

/// Bearer token 优先，其次取请求体里的身份字段
fn resolve_identity(
    state: &AppState,
    headers: &HeaderMap,
    body: &Value,
    field: &str,
) -> Result<Option<UserId>, ApiError> {
    if let Some(identity) = state.jwt_service.identity_from_headers(headers)? {
        return Ok(Some(identity.user_id));
    }
    Ok(identity_field(body, field)?)
}

async fn create_question(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<QuestionView>), ApiError> {
    let payload = parse_body(&body)?;
    let author_id = resolve_identity(&state, &headers, &payload, "authorId")?;

    let question = state
        .intake_service
        .submit(CreateQuestionRequest {
            author_id,
            session_id: Some(SessionId::from(session_id)),
            payload,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(QuestionView::from(&question))))
}

async fn list_questions(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<QuestionListing>, ApiError> {
    let listing = state
        .query_service
        .list_questions(
            SessionId::from(session_id),
            ListQuestionsQuery {
                visibility: query.visibility,
                status: query.status,
            },
        )
        .await?;

    Ok(Json(listing))
}

async fn upvote_question(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<QuestionView>, ApiError> {
    let payload = parse_body(&body)?;
    let actor_id = resolve_identity(&state, &headers, &payload, "actorId")?;

    let question = state
        .moderation_service
        .upvote(actor_id, QuestionId::from(question_id))
        .await?;

    Ok(Json(QuestionView::from(&question)))
}

async fn change_status(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<QuestionView>, ApiError> {
    let payload = parse_body(&body)?;
    let actor_id = resolve_identity(&state, &headers, &payload, "actorId")?;

    let question = state
        .moderation_service
        .change_status(
            actor_id,
            QuestionId::from(question_id),
            payload.get("status").and_then(Value::as_str),
        )
        .await?;

    Ok(Json(QuestionView::from(&question)))
}

async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .ok_or_else(|| ApiError::unauthorized("Missing token"))?;
    let claims = state.jwt_service.verify_token(&token)?;

    let session_id = SessionId::from(query.session_id);
    let mut rooms = vec![Room::Session(session_id)];
    if claims.role == Role::Instructor {
        rooms.push(Room::Instructors(session_id));
    }

    // 握手完成前先订阅，连接建立后的事件不会漏掉
    let subscription = state.rooms.subscribe(rooms);
    let connection = WebSocketConnection::new(state, claims.into(), session_id, subscription);

    Ok(ws.on_upgrade(move |socket| connection.run(socket)))
}
