mod support;

use application::QuestionRateLimiter;
use axum::{body::Body, http::Request, http::StatusCode};
use domain::{SessionId, UserId};
use serde_json::json;
use uuid::Uuid;
use web_api::Role;

use support::{build_app, json_request, questions_uri, send_request};

#[tokio::test]
async fn create_question_returns_created_view() {
    let app = build_app().await;
    let author = Uuid::new_v4();

    let (status, body) = send_request(
        &app.router,
        json_request(
            "POST",
            &questions_uri(app.session_id),
            json!({
                "content": "  Is the midterm cumulative?  ",
                "authorId": author.to_string(),
                "slideId": "slide-3"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "Is the midterm cumulative?");
    assert_eq!(body["authorId"], author.to_string());
    assert_eq!(body["visibility"], "PUBLIC");
    assert_eq!(body["status"], "OPEN");
    assert_eq!(body["upvoteCount"], 0);
    assert_eq!(body["isAnonymous"], false);
    assert_eq!(body["slideId"], "slide-3");
    assert_eq!(body["sessionId"], app.session_id.to_string());
}

#[tokio::test]
async fn anonymous_question_is_redacted_in_response_and_listing() {
    let app = build_app().await;
    let author = Uuid::new_v4();

    let (status, body) = send_request(
        &app.router,
        json_request(
            "POST",
            &questions_uri(app.session_id),
            json!({
                "content": "Is the midterm cumulative?",
                "authorId": author.to_string(),
                "isAnonymous": true
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["authorId"].is_null());

    let (status, listing) = send_request(
        &app.router,
        Request::builder()
            .uri(questions_uri(app.session_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["sessionId"], app.session_id.to_string());
    assert!(listing["questions"][0]["authorId"].is_null());
    assert_eq!(listing["questions"][0]["answerCount"], 0);

    let stored = app.questions.stored().await;
    assert_eq!(stored[0].author_id, UserId::from(author));
}

#[tokio::test]
async fn length_bounds_are_enforced() {
    let app = build_app().await;
    let author = Uuid::new_v4().to_string();

    let cases = [
        (json!({ "authorId": author }), "Question content is required."),
        (
            json!({ "authorId": author, "content": "hi" }),
            "Question must be at least 5 characters.",
        ),
        (
            json!({ "authorId": author, "content": "x".repeat(501) }),
            "Question must be no more than 500 characters.",
        ),
        (
            json!({ "authorId": author, "content": "Valid question", "visibility": "STAFF" }),
            "Invalid visibility setting. Must be PUBLIC or INSTRUCTOR_ONLY.",
        ),
    ];

    for (body, message) in cases {
        let (status, response) = send_request(
            &app.router,
            json_request("POST", &questions_uri(app.session_id), body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], message);
    }

    let (status, _) = send_request(
        &app.router,
        json_request(
            "POST",
            &questions_uri(app.session_id),
            json!({ "authorId": author, "content": "x".repeat(500) }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(app.questions.stored().await.len(), 1);
}

#[tokio::test]
async fn short_question_does_not_touch_rate_limit() {
    let app = build_app().await;
    let author = Uuid::new_v4();

    let (status, _) = send_request(
        &app.router,
        json_request(
            "POST",
            &questions_uri(app.session_id),
            json!({ "authorId": author.to_string(), "content": "hi" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.questions.stored().await.is_empty());
    assert_eq!(
        app.counters
            .count(&QuestionRateLimiter::key_for(UserId::from(author))),
        0
    );
}

#[tokio::test]
async fn missing_identity_is_unauthorized_and_bad_json_is_rejected() {
    let app = build_app().await;

    let (status, body) = send_request(
        &app.router,
        json_request(
            "POST",
            &questions_uri(app.session_id),
            json!({ "content": "Who am I?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTHENTICATION_REQUIRED");

    let (status, body) = send_request(
        &app.router,
        Request::builder()
            .method("POST")
            .uri(questions_uri(app.session_id))
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_REQUEST");
}

#[tokio::test]
async fn bearer_token_supplies_identity() {
    let app = build_app().await;
    let user = Uuid::new_v4();
    let token = app.jwt.generate_token(user, Role::Participant).unwrap();

    let mut request = json_request(
        "POST",
        &questions_uri(app.session_id),
        json!({ "content": "Token based question" }),
    );
    request
        .headers_mut()
        .insert("authorization", format!("Bearer {token}").parse().unwrap());

    let (status, body) = send_request(&app.router, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["authorId"], user.to_string());
}

#[tokio::test]
async fn rate_limit_allows_ten_then_rejects() {
    let app = build_app().await;
    let author = Uuid::new_v4().to_string();

    for i in 0..10 {
        let (status, _) = send_request(
            &app.router,
            json_request(
                "POST",
                &questions_uri(app.session_id),
                json!({ "authorId": author, "content": format!("Question {i} here") }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "question {i}");
    }

    let (status, body) = send_request(
        &app.router,
        json_request(
            "POST",
            &questions_uri(app.session_id),
            json!({ "authorId": author, "content": "Eleventh question" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["message"],
        "Rate limit exceeded. Please wait before asking another question."
    );
    assert_eq!(app.questions.stored().await.len(), 10);
}

#[tokio::test]
async fn unknown_and_disabled_sessions_are_distinct() {
    let app = build_app().await;
    let author = Uuid::new_v4().to_string();

    let (status, body) = send_request(
        &app.router,
        json_request(
            "POST",
            &questions_uri(SessionId::from(Uuid::new_v4())),
            json!({ "authorId": author, "content": "Anyone here?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Session not found.");

    app.sessions
        .set_submissions_enabled(app.session_id, false)
        .await;
    let (status, body) = send_request(
        &app.router,
        json_request(
            "POST",
            &questions_uri(app.session_id),
            json!({ "authorId": author, "content": "Can I still ask?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Question submissions are currently disabled for this session."
    );

    assert!(app.questions.stored().await.is_empty());

    let (status, _) = send_request(
        &app.router,
        Request::builder()
            .uri(questions_uri(SessionId::from(Uuid::new_v4())))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_filters_by_visibility_and_ignores_unknown_values() {
    let app = build_app().await;
    let author = Uuid::new_v4().to_string();

    for (content, visibility) in [
        ("Public one here", "PUBLIC"),
        ("Private one here", "INSTRUCTOR_ONLY"),
    ] {
        let (status, _) = send_request(
            &app.router,
            json_request(
                "POST",
                &questions_uri(app.session_id),
                json!({ "authorId": author, "content": content, "visibility": visibility }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let uri = format!("{}?visibility=INSTRUCTOR_ONLY", questions_uri(app.session_id));
    let (_, listing) = send_request(
        &app.router,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["questions"][0]["content"], "Private one here");

    let uri = format!("{}?visibility=nonsense", questions_uri(app.session_id));
    let (_, listing) = send_request(
        &app.router,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(listing["count"], 2);
    let mut contents: Vec<&str> = listing["questions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|question| question["content"].as_str())
        .collect();
    contents.sort();
    assert_eq!(contents, vec!["Private one here", "Public one here"]);
}

#[tokio::test]
async fn upvote_and_status_transitions() {
    let app = build_app().await;
    let actor = Uuid::new_v4().to_string();

    let (_, created) = send_request(
        &app.router,
        json_request(
            "POST",
            &questions_uri(app.session_id),
            json!({ "authorId": actor, "content": "When are office hours?" }),
        ),
    )
    .await;
    let question_id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send_request(
        &app.router,
        json_request(
            "POST",
            &format!("/api/v1/questions/{question_id}/upvote"),
            json!({ "actorId": actor }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upvoteCount"], 1);

    let (status, body) = send_request(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/v1/questions/{question_id}/status"),
            json!({ "actorId": actor, "status": "RESOLVED" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "RESOLVED");

    let (status, body) = send_request(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/v1/questions/{question_id}/status"),
            json!({ "actorId": actor, "status": "OPEN" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATUS_TRANSITION");

    let (status, _) = send_request(
        &app.router,
        json_request(
            "POST",
            &format!("/api/v1/questions/{}/upvote", Uuid::new_v4()),
            json!({ "actorId": actor }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_request(
        &app.router,
        json_request(
            "POST",
            &format!("/api/v1/questions/{question_id}/upvote"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_check() {
    let app = build_app().await;
    let (status, _) = send_request(
        &app.router,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
