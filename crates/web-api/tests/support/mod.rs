#![allow(dead_code)]

use std::sync::Arc;

use application::memory::{
    InMemoryCounterStore, InMemoryQuestionRepository, InMemorySessionRepository,
};
use application::{
    IntakePolicy, IntakeServiceDependencies, ModerationServiceDependencies,
    QueryServiceDependencies, QuestionIntakeService, QuestionModerationService,
    QuestionQueryService, SystemClock,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use domain::{CourseId, Session, SessionId};
use infrastructure::LocalRoomTransport;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use web_api::{router, AppState, JwtConfig, JwtService};

pub const JWT_SECRET: &str = "integration-test-secret-with-enough-bytes";

pub struct TestApp {
    pub router: Router,
    pub sessions: Arc<InMemorySessionRepository>,
    pub questions: Arc<InMemoryQuestionRepository>,
    pub counters: Arc<InMemoryCounterStore>,
    pub rooms: LocalRoomTransport,
    pub jwt: Arc<JwtService>,
    pub session_id: SessionId,
}

/// 内存协作方 + 进程内房间总线，不依赖数据库和 Redis
pub async fn build_app() -> TestApp {
    let sessions = Arc::new(InMemorySessionRepository::new());
    let questions = Arc::new(InMemoryQuestionRepository::new());
    let counters = Arc::new(InMemoryCounterStore::new());
    let rooms = LocalRoomTransport::new(64);
    let policy = IntakePolicy::default();

    let session_id = SessionId::from(Uuid::new_v4());
    sessions
        .insert(Session::new(
            session_id,
            CourseId::from(Uuid::new_v4()),
            "Intro to Economics",
            Utc::now(),
        ))
        .await;

    let intake_service = Arc::new(QuestionIntakeService::new(IntakeServiceDependencies {
        session_repository: sessions.clone(),
        question_repository: questions.clone(),
        counter_store: counters.clone(),
        transport: Arc::new(rooms.clone()),
        clock: Arc::new(SystemClock),
        policy,
    }));
    let query_service = Arc::new(QuestionQueryService::new(QueryServiceDependencies {
        session_repository: sessions.clone(),
        question_repository: questions.clone(),
        call_timeout: policy.call_timeout,
    }));
    let moderation_service = Arc::new(QuestionModerationService::new(
        ModerationServiceDependencies {
            question_repository: questions.clone(),
            transport: Arc::new(rooms.clone()),
            call_timeout: policy.call_timeout,
        },
    ));

    let jwt = Arc::new(JwtService::new(JwtConfig {
        secret: JWT_SECRET.to_string(),
        expiration_hours: 1,
    }));

    let state = AppState::new(
        intake_service,
        query_service,
        moderation_service,
        rooms.clone(),
        jwt.clone(),
    );

    TestApp {
        router: router(state),
        sessions,
        questions,
        counters,
        rooms,
        jwt,
        session_id,
    }
}

pub async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));
    (status, body)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn questions_uri(session_id: SessionId) -> String {
    format!("/api/v1/sessions/{session_id}/questions")
}
