use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::sessions::helpers::{ensure_writable, load_session};
use crate::api::validation::clean_text;
use crate::core::metrics::CHAT_TURNS_TOTAL;
use crate::core::redis::chat_rate_key;
use crate::core::state::AppState;
use crate::core::time::now_utc;
use crate::repositories;
use crate::schemas::chat::{ChatRequest, ChatResponse};
use crate::services::conversation::{next_context, ProblemProgress};
use crate::services::tutor_model::TutorTurn;

const RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

/// One Socratic turn: the student's message goes to the tutor together with
/// the current problem and recent history, and the pair is appended to the
/// transcript with updated progress counters.
pub(super) async fn send_message(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let tutoring = state.settings().tutoring();
    let message = clean_text("message", &payload.message, tutoring.max_message_chars)?;

    let session = load_session(&state, &code).await?;
    ensure_writable(&session)?;
    enforce_rate_limit(&state, &session.code).await?;

    let problem_id = session.current_problem_id.clone().ok_or_else(|| {
        ApiError::BadRequest("Submit a problem before starting the conversation".to_string())
    })?;
    let problem = repositories::problems::find_in_session(state.db(), &session.id, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load current problem"))?
        .ok_or_else(|| {
            ApiError::internal("dangling current_problem_id", "Current problem is missing")
        })?;

    let latest = repositories::transcript::latest_for_problem(state.db(), &session.id, &problem.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load conversation state"))?;
    let progress = ProblemProgress::after(latest.as_ref());
    let history = repositories::transcript::recent_for_problem(
        state.db(),
        &session.id,
        &problem.id,
        tutoring.max_history_turns,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load conversation history"))?;

    let escalate = progress.should_escalate(tutoring.stuck_turn_threshold);
    let reply = state
        .tutor()
        .tutor_reply(TutorTurn {
            problem: &problem.text,
            history: &history,
            student_message: &message,
            hints_used: progress.hints_used,
            stuck_turns: progress.stuck_turns,
            escalate,
        })
        .await?;

    let now = now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start chat transaction"))?;

    // Step numbers are assigned under the session row lock.
    let locked = repositories::sessions::lock_by_id(&mut *tx, &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock session"))?;
    ensure_writable(&locked)?;
    if locked.current_problem_id.as_deref() != Some(problem.id.as_str()) {
        return Err(ApiError::Conflict(
            "The current problem changed while the tutor was replying".to_string(),
        ));
    }

    let last_step = repositories::transcript::max_step(&mut *tx, &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to read last step"))?;
    let latest = repositories::transcript::latest_for_problem(&mut *tx, &session.id, &problem.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load conversation state"))?;
    let context = next_context(last_step, ProblemProgress::after(latest.as_ref()), &reply);

    repositories::transcript::insert(
        &mut *tx,
        repositories::transcript::CreateEntry {
            id: &Uuid::new_v4().to_string(),
            session_id: &session.id,
            problem_id: &problem.id,
            step_number: context.step_number,
            student_message: &message,
            tutor_message: &reply.tutor_message,
            hints_used: context.hints_used,
            progress_made: context.progress_made,
            stuck_turns: context.stuck_turns,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record chat turn"))?;

    if reply.problem_solved {
        repositories::problems::mark_solved(&mut *tx, &problem.id, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to mark problem solved"))?;
    }

    repositories::sessions::touch_active(&mut *tx, &session.id, None, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update session activity"))?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit chat turn"))?;

    let progress_label = if context.progress_made { "yes" } else { "no" };
    metrics::counter!(CHAT_TURNS_TOTAL, "progress" => progress_label).increment(1);
    tracing::info!(
        session_code = %session.code,
        step_number = context.step_number,
        hints_used = context.hints_used,
        stuck_turns = context.stuck_turns,
        escalated = escalate,
        problem_solved = reply.problem_solved,
        "Chat turn recorded"
    );

    Ok(Json(ChatResponse {
        tutor_message: reply.tutor_message,
        conversation_context: context,
        problem_id: problem.id,
        problem_solved: reply.problem_solved,
    }))
}

async fn enforce_rate_limit(state: &AppState, session_code: &str) -> Result<(), ApiError> {
    let limit = state.settings().tutoring().chat_rate_limit_per_minute;
    if limit == 0 {
        return Ok(());
    }

    match state
        .redis()
        .allow_within_window(&chat_rate_key(session_code), limit, RATE_LIMIT_WINDOW_SECONDS)
        .await
    {
        Ok(true) => Ok(()),
        Ok(false) => Err(ApiError::TooManyRequests("Too many messages, slow down a little")),
        Err(err) => {
            tracing::warn!(error = %err, "Chat rate limit check failed; allowing request");
            Ok(())
        }
    }
}
