use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use time::Duration;
use tower::ServiceExt;

use crate::core::time::now_utc;
use crate::repositories;
use crate::services::openai::LlmError;
use crate::test_support::{self, TestContext};

async fn create_session(ctx: &TestContext) -> String {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, "/api/sessions", None))
        .await
        .expect("create session");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    body["session_code"].as_str().expect("session code").to_string()
}

async fn submit_problem(ctx: &TestContext, code: &str, text: &str) -> Value {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/sessions/{code}/problems"),
            Some(json!({ "text": text })),
        ))
        .await
        .expect("submit problem");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    body
}

async fn chat(ctx: &TestContext, code: &str, message: &str) -> (StatusCode, Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/sessions/{code}/chat"),
            Some(json!({ "message": message })),
        ))
        .await
        .expect("chat");

    let status = response.status();
    (status, test_support::read_json(response).await)
}

async fn get_session(ctx: &TestContext, code: &str) -> (StatusCode, Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &format!("/api/sessions/{code}"), None))
        .await
        .expect("get session");

    let status = response.status();
    (status, test_support::read_json(response).await)
}

#[tokio::test]
async fn created_session_is_unique_and_retrievable() {
    let ctx = test_support::setup_test_context().await;

    let first = create_session(&ctx).await;
    let second = create_session(&ctx).await;
    assert_ne!(first, second);
    assert_eq!(first.len(), ctx.state.settings().tutoring().session_code_length);

    let (status, body) = get_session(&ctx, &first).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["session_code"], first);
    assert_eq!(body["status"], "created");
    assert_eq!(body["problems"].as_array().expect("problems").len(), 0);

    let (status, _) = get_session(&ctx, &first.to_lowercase()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn resuming_returns_existing_problems_and_transcript() {
    let ctx = test_support::setup_test_context().await;

    let code = create_session(&ctx).await;
    submit_problem(&ctx, &code, "Solve 2x + 3 = 7").await;
    let (status, _) = chat(&ctx, &code, "I subtract 3 first?").await;
    assert_eq!(status, StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/sessions",
            Some(json!({ "session_code": code })),
        ))
        .await
        .expect("resume session");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["session_code"], code);
    assert_eq!(body["status"], "resumed");
    assert_eq!(body["resumed"], true);
    assert_eq!(body["resume_count"], 1);
    assert_eq!(body["problems"].as_array().expect("problems").len(), 1);
    assert_eq!(body["problems"][0]["text"], "Solve 2x + 3 = 7");
    assert_eq!(body["transcript"].as_array().expect("transcript").len(), 1);

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tutoring_sessions")
        .fetch_one(ctx.state.db())
        .await
        .expect("count sessions");
    assert_eq!(sessions, 1);
}

#[tokio::test]
async fn resuming_unknown_code_returns_404() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/sessions",
            Some(json!({ "session_code": "ZZZZ99" })),
        ))
        .await
        .expect("resume unknown");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

async fn session_count(ctx: &TestContext) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tutoring_sessions")
        .fetch_one(ctx.state.db())
        .await
        .expect("count sessions")
}

fn raw_create_request(body: impl Into<String>, content_type: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::POST).uri("/api/sessions");
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(body.into())).expect("request body")
}

#[tokio::test]
async fn resume_without_content_type_still_resumes() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;

    let body = json!({ "session_code": code }).to_string();
    let response =
        ctx.app.clone().oneshot(raw_create_request(body, None)).await.expect("resume session");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["session_code"], code);
    assert_eq!(session_count(&ctx).await, 1);
}

#[tokio::test]
async fn malformed_create_body_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    create_session(&ctx).await;

    for body in [r#"{"session_code":123456}"#, r#"{"session_code":"#, "not json"] {
        let response = ctx
            .app
            .clone()
            .oneshot(raw_create_request(body, Some("application/json")))
            .await
            .expect("create with bad body");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
    assert_eq!(session_count(&ctx).await, 1);

    let response = ctx
        .app
        .clone()
        .oneshot(raw_create_request("{}", Some("application/json")))
        .await
        .expect("create with empty object");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn chat_turns_strictly_increment_step_number() {
    let ctx = test_support::setup_test_context().await;

    let code = create_session(&ctx).await;
    submit_problem(&ctx, &code, "Factor x^2 - 5x + 6").await;

    let mut steps = Vec::new();
    for message in ["Where do I start?", "Two numbers that multiply to 6?", "2 and 3?"] {
        let (status, body) = chat(&ctx, &code, message).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        steps.push(body["conversation_context"]["step_number"].as_i64().expect("step"));
    }
    assert_eq!(steps, vec![1, 2, 3]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/sessions/{code}/transcript"),
            None,
        ))
        .await
        .expect("transcript");
    let body = test_support::read_json(response).await;
    let entries = body["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["student_message"], "Where do I start?");
    assert_eq!(entries[2]["step_number"], 3);

    let turns = ctx.tutor.turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0].problem, "Factor x^2 - 5x + 6");
    assert_eq!(turns[2].student_message, "2 and 3?");
    assert_eq!(turns[2].history_len, 2);
}

#[tokio::test]
async fn step_numbers_continue_across_problems_while_counters_reset() {
    let ctx = test_support::setup_test_context().await;

    let code = create_session(&ctx).await;
    submit_problem(&ctx, &code, "Solve x + 1 = 2").await;
    ctx.tutor.push_reply(false, true, false);
    let (_, first) = chat(&ctx, &code, "x is 1?").await;
    assert_eq!(first["conversation_context"]["hints_used"], 1);
    assert_eq!(first["conversation_context"]["stuck_turns"], 1);

    submit_problem(&ctx, &code, "Solve 3x = 9").await;
    ctx.tutor.push_reply(true, false, false);
    ctx.tutor.push_reply(false, true, false);

    let (status, body) = chat(&ctx, &code, "Divide by 3?").await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["conversation_context"]["step_number"], 2);
    assert_eq!(body["conversation_context"]["hints_used"], 0);
    assert_eq!(body["conversation_context"]["stuck_turns"], 0);
    assert_eq!(ctx.tutor.turns()[1].history_len, 0);

    let (_, body) = chat(&ctx, &code, "So x = 3?").await;
    assert_eq!(body["conversation_context"]["step_number"], 3);
    assert_eq!(body["conversation_context"]["hints_used"], 1);
    assert_eq!(body["conversation_context"]["stuck_turns"], 1);
}

#[tokio::test]
async fn concurrent_chat_turns_get_consecutive_steps() {
    let ctx = test_support::setup_test_context().await;

    let code = create_session(&ctx).await;
    submit_problem(&ctx, &code, "Solve 10 - x = 4").await;

    let ((first_status, first), (second_status, second)) =
        tokio::join!(chat(&ctx, &code, "Is x 6?"), chat(&ctx, &code, "Or maybe 14?"));
    assert_eq!(first_status, StatusCode::OK, "response: {first}");
    assert_eq!(second_status, StatusCode::OK, "response: {second}");

    let mut steps = vec![
        first["conversation_context"]["step_number"].as_i64().expect("step"),
        second["conversation_context"]["step_number"].as_i64().expect("step"),
    ];
    steps.sort_unstable();
    assert_eq!(steps, vec![1, 2]);
}

#[tokio::test]
async fn turn_is_rejected_when_current_problem_changes_mid_reply() {
    let ctx = test_support::setup_test_context().await;

    let code = create_session(&ctx).await;
    let first = submit_problem(&ctx, &code, "Solve m + 4 = 9").await;
    submit_problem(&ctx, &code, "Solve n - 4 = 9").await;
    let first_id = first["id"].as_str().expect("problem id").to_string();

    let gate = ctx.tutor.hold_next_reply();
    let app = ctx.app.clone();
    let chat_uri = format!("/api/sessions/{code}/chat");
    let pending = tokio::spawn(async move {
        app.oneshot(test_support::json_request(
            Method::POST,
            &chat_uri,
            Some(json!({ "message": "n is 13" })),
        ))
        .await
    });

    gate.entered.notified().await;
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/sessions/{code}/problems/{first_id}/select"),
            None,
        ))
        .await
        .expect("select problem");
    assert_eq!(response.status(), StatusCode::OK);
    gate.release.notify_one();

    let response = pending.await.expect("chat task").expect("chat");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let (_, session) = get_session(&ctx, &code).await;
    assert_eq!(session["transcript"].as_array().expect("transcript").len(), 0);
    assert_eq!(session["current_problem_id"], first_id.as_str());
}

#[tokio::test]
async fn stuck_turns_count_up_and_reset_on_progress() {
    let ctx = test_support::setup_test_context().await;

    let code = create_session(&ctx).await;
    submit_problem(&ctx, &code, "Integrate 2x dx").await;

    ctx.tutor.push_reply(false, true, false);
    ctx.tutor.push_reply(false, false, false);
    ctx.tutor.push_reply(false, true, false);
    ctx.tutor.push_reply(false, false, false);
    ctx.tutor.push_reply(true, false, false);

    let mut contexts = Vec::new();
    for message in ["no idea", "still lost", "hmm", "what?", "x^2 + C"] {
        let (status, body) = chat(&ctx, &code, message).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        contexts.push(body["conversation_context"].clone());
    }

    let stuck: Vec<i64> =
        contexts.iter().map(|c| c["stuck_turns"].as_i64().expect("stuck")).collect();
    let hints: Vec<i64> =
        contexts.iter().map(|c| c["hints_used"].as_i64().expect("hints")).collect();
    assert_eq!(stuck, vec![1, 2, 3, 4, 0]);
    assert_eq!(hints, vec![1, 1, 2, 2, 2]);
    assert_eq!(contexts[4]["progress_made"], true);

    let escalated: Vec<bool> = ctx.tutor.turns().iter().map(|turn| turn.escalate).collect();
    assert_eq!(escalated, vec![false, false, false, true, true]);
}

#[tokio::test]
async fn solved_problem_is_marked() {
    let ctx = test_support::setup_test_context().await;

    let code = create_session(&ctx).await;
    let problem = submit_problem(&ctx, &code, "What is 7 * 8?").await;
    ctx.tutor.push_reply(true, false, true);

    let (status, body) = chat(&ctx, &code, "56").await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["problem_solved"], true);

    let (_, session) = get_session(&ctx, &code).await;
    assert_eq!(session["status"], "active");
    assert_eq!(session["problems"][0]["id"], problem["id"]);
    assert_eq!(session["problems"][0]["status"], "solved");
    assert!(session["problems"][0]["solved_at"].is_string());
}

#[tokio::test]
async fn submitting_problem_to_unknown_session_returns_404() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/sessions/NOPE42/problems",
            Some(json!({ "text": "Solve x = 1" })),
        ))
        .await
        .expect("submit to unknown");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["detail"], "Session not found");
}

#[tokio::test]
async fn blank_problem_text_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/sessions/{code}/problems"),
            Some(json!({ "text": "   " })),
        ))
        .await
        .expect("submit blank");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_without_problem_returns_400() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;

    let (status, body) = chat(&ctx, &code, "Hello?").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(ctx.tutor.turns().is_empty());
}

#[tokio::test]
async fn unclassified_problem_is_still_stored() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;
    ctx.tutor.fail_classification();

    let problem = submit_problem(&ctx, &code, "Prove sqrt(2) is irrational").await;
    assert_eq!(problem["category"], "uncategorized");
    assert_eq!(problem["difficulty"], "unknown");
    assert_eq!(problem["is_current"], true);
}

#[tokio::test]
async fn closed_session_rejects_writes() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;
    submit_problem(&ctx, &code, "Solve 5x = 10").await;

    for _ in 0..2 {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/sessions/{code}/close"),
                None,
            ))
            .await
            .expect("close session");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["status"], "closed");
    }

    let (status, _) = chat(&ctx, &code, "x = 2").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/sessions",
            Some(json!({ "session_code": code })),
        ))
        .await
        .expect("resume closed");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let (status, body) = get_session(&ctx, &code).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "closed");
}

#[tokio::test]
async fn idle_session_expires_on_access() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;

    let session = repositories::sessions::find_by_code(ctx.state.db(), &code)
        .await
        .expect("find session")
        .expect("session exists");
    let ttl = ctx.state.settings().tutoring().session_idle_ttl_hours as i64;
    repositories::sessions::set_last_active(
        ctx.state.db(),
        &session.id,
        now_utc() - Duration::hours(ttl + 1),
    )
    .await
    .expect("backdate session");

    let (status, body) = get_session(&ctx, &code).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "expired");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/sessions/{code}/problems"),
            Some(json!({ "text": "Solve y - 1 = 0" })),
        ))
        .await
        .expect("submit to expired");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn lazy_expiry_leaves_closed_and_active_sessions_alone() {
    let ctx = test_support::setup_test_context().await;

    let closed_code = create_session(&ctx).await;
    let closed = repositories::sessions::find_by_code(ctx.state.db(), &closed_code)
        .await
        .expect("find session")
        .expect("session exists");
    repositories::sessions::close(ctx.state.db(), &closed.id, now_utc())
        .await
        .expect("close session");

    let active_code = create_session(&ctx).await;
    let active = repositories::sessions::find_by_code(ctx.state.db(), &active_code)
        .await
        .expect("find session")
        .expect("session exists");

    let now = now_utc();
    let stale_cutoff = now + Duration::hours(1);
    let fresh_cutoff = now - Duration::hours(1);

    let result = repositories::sessions::expire(ctx.state.db(), &closed.id, stale_cutoff, now)
        .await
        .expect("expire closed");
    assert!(result.is_none());

    let result = repositories::sessions::expire(ctx.state.db(), &active.id, fresh_cutoff, now)
        .await
        .expect("expire active");
    assert!(result.is_none());

    let (_, body) = get_session(&ctx, &closed_code).await;
    assert_eq!(body["status"], "closed");
    let (_, body) = get_session(&ctx, &active_code).await;
    assert_eq!(body["status"], "created");
}

#[tokio::test]
async fn selecting_problem_from_other_session_returns_404() {
    let ctx = test_support::setup_test_context().await;

    let first = create_session(&ctx).await;
    let second = create_session(&ctx).await;
    let foreign = submit_problem(&ctx, &second, "Solve 4x = 8").await;
    let foreign_id = foreign["id"].as_str().expect("problem id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/sessions/{first}/problems/{foreign_id}/select"),
            None,
        ))
        .await
        .expect("select foreign problem");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn selecting_earlier_problem_makes_it_current() {
    let ctx = test_support::setup_test_context().await;

    let code = create_session(&ctx).await;
    let earlier = submit_problem(&ctx, &code, "Solve a + 2 = 5").await;
    submit_problem(&ctx, &code, "Solve b - 2 = 5").await;
    let earlier_id = earlier["id"].as_str().expect("problem id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/sessions/{code}/problems/{earlier_id}/select"),
            None,
        ))
        .await
        .expect("select problem");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["current_problem_id"], earlier_id);
    assert_eq!(body["problems"][0]["is_current"], true);
    assert_eq!(body["problems"][1]["is_current"], false);

    let (_, reply) = chat(&ctx, &code, "a is 3").await;
    assert_eq!(reply["problem_id"], earlier_id);
}

#[tokio::test]
async fn similar_problems_are_capped_by_settings() {
    let ctx = test_support::setup_test_context().await;

    let code = create_session(&ctx).await;
    let problem = submit_problem(&ctx, &code, "Solve x^2 = 9").await;
    let problem_id = problem["id"].as_str().expect("problem id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/sessions/{code}/problems/{problem_id}/similar?count=8"),
            None,
        ))
        .await
        .expect("similar problems");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    let max = ctx.state.settings().tutoring().max_similar_problems as usize;
    assert_eq!(body["problems"].as_array().expect("problems").len(), max);
    assert_eq!(body["problems"][0]["difficulty"], "medium");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/sessions/{code}/problems/{problem_id}/similar"),
            None,
        ))
        .await
        .expect("default similar problems");
    let body = test_support::read_json(response).await;
    assert_eq!(body["problems"].as_array().expect("problems").len(), 3);
}

#[tokio::test]
async fn image_upload_creates_image_problem() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            &format!("/api/sessions/{code}/problems/image"),
            "homework.png",
            "image/png",
            b"\x89PNG fake image bytes",
        ))
        .await
        .expect("upload image");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["source"], "image");
    assert_eq!(body["text"], "Solve $3x + 2 = 11$");
}

#[tokio::test]
async fn image_upload_rejects_unsupported_extension() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            &format!("/api/sessions/{code}/problems/image"),
            "homework.gif",
            "image/gif",
            b"GIF89a",
        ))
        .await
        .expect("upload gif");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreadable_image_returns_422() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;
    ctx.tutor.set_extraction(Err(LlmError::Unreadable("No math problem found".to_string())));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            &format!("/api/sessions/{code}/problems/image"),
            "blurry.jpg",
            "image/jpeg",
            b"\xff\xd8\xff fake jpeg",
        ))
        .await
        .expect("upload unreadable");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn provider_errors_propagate_without_recording_turn() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;
    submit_problem(&ctx, &code, "Solve 6 / x = 2").await;

    ctx.tutor.push_error(LlmError::RateLimited);
    let (status, _) = chat(&ctx, &code, "x = 3?").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    ctx.tutor.push_error(LlmError::Unauthorized);
    let (status, _) = chat(&ctx, &code, "x = 3?").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.tutor.push_error(LlmError::Provider { status: 500, detail: "boom".to_string() });
    let (status, _) = chat(&ctx, &code, "x = 3?").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, body) = chat(&ctx, &code, "x = 3?").await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["conversation_context"]["step_number"], 1);
}

#[tokio::test]
async fn chat_is_rate_limited_per_session() {
    let ctx = test_support::setup_test_context().await;
    let code = create_session(&ctx).await;
    submit_problem(&ctx, &code, "Solve 2^x = 8").await;

    let limit = ctx.state.settings().tutoring().chat_rate_limit_per_minute;
    for _ in 0..limit {
        let (status, body) = chat(&ctx, &code, "x = 3?").await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
    }

    let (status, body) = chat(&ctx, &code, "one more").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS, "response: {body}");
}
