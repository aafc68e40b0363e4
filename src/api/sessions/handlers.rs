use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::sessions::helpers::{ensure_writable, load_session, session_response};
use crate::core::metrics::SESSIONS_CREATED_TOTAL;
use crate::core::state::AppState;
use crate::core::time::now_utc;
use crate::db::models::TutoringSession;
use crate::db::types::SessionStatus;
use crate::repositories;
use crate::schemas::chat::{TranscriptEntryResponse, TranscriptResponse};
use crate::schemas::session::{CreateSessionRequest, SessionResponse};
use crate::services::session_codes::generate_session_code;

const MAX_CODE_ATTEMPTS: usize = 8;

/// `POST /sessions`: with a known `session_code` the session is resumed and
/// returned as-is; otherwise a fresh session with a new code is created.
/// An empty body means "create"; a body that is not a valid request is a 400.
pub(super) async fn create_or_resume(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let payload = parse_create_request(&body)?;

    let requested_code =
        payload.session_code.as_deref().map(str::trim).filter(|code| !code.is_empty());
    if let Some(code) = requested_code {
        let session = resume(&state, code).await?;
        let response = session_response(&state, session, true).await?;
        return Ok((StatusCode::OK, Json(response)));
    }

    let session = create(&state).await?;
    let response = session_response(&state, session, false).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

fn parse_create_request(body: &[u8]) -> Result<CreateSessionRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateSessionRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid session request: {err}")))
}

async fn resume(state: &AppState, code: &str) -> Result<TutoringSession, ApiError> {
    let session = load_session(state, code).await?;
    if session.status.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "Session {} is {} and cannot be resumed",
            session.code,
            session.status.as_str()
        )));
    }

    let session = repositories::sessions::mark_resumed(state.db(), &session.id, now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to resume session"))?;
    tracing::info!(
        session_code = %session.code,
        resume_count = session.resume_count,
        "Session resumed"
    );
    Ok(session)
}

async fn create(state: &AppState) -> Result<TutoringSession, ApiError> {
    let code_length = state.settings().tutoring().session_code_length;

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = generate_session_code(code_length);
        let created = repositories::sessions::create(
            state.db(),
            repositories::sessions::CreateSession {
                id: &Uuid::new_v4().to_string(),
                code: &code,
                now: now_utc(),
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create session"))?;

        if let Some(session) = created {
            metrics::counter!(SESSIONS_CREATED_TOTAL).increment(1);
            tracing::info!(session_code = %session.code, "Session created");
            return Ok(session);
        }
        tracing::debug!(attempt, "Session code collision, drawing another");
    }

    Err(ApiError::Internal("Could not allocate a unique session code".to_string()))
}

pub(super) async fn get_session(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = load_session(&state, &code).await?;
    Ok(Json(session_response(&state, session, false).await?))
}

pub(super) async fn get_transcript(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let session = load_session(&state, &code).await?;
    let entries = repositories::transcript::list_by_session(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load transcript"))?;

    Ok(Json(TranscriptResponse {
        session_code: session.code,
        entries: entries.into_iter().map(TranscriptEntryResponse::from).collect(),
    }))
}

/// Closing is idempotent: an already-closed session is returned unchanged.
pub(super) async fn close_session(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = load_session(&state, &code).await?;
    if session.status == SessionStatus::Closed {
        return Ok(Json(session_response(&state, session, false).await?));
    }
    ensure_writable(&session)?;

    let session = repositories::sessions::close(state.db(), &session.id, now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to close session"))?;
    tracing::info!(session_code = %session.code, "Session closed");

    Ok(Json(session_response(&state, session, false).await?))
}
