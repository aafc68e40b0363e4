use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::core::time::{idle_cutoff, now_utc};
use crate::db::models::TutoringSession;
use crate::repositories;
use crate::schemas::session::SessionResponse;
use crate::services::session_codes::normalize_session_code;

/// Resolves a path code to its session, expiring it on the spot if it has
/// been idle past the configured TTL.
pub(super) async fn load_session(
    state: &AppState,
    raw_code: &str,
) -> Result<TutoringSession, ApiError> {
    let code = normalize_session_code(raw_code).ok_or_else(ApiError::session_not_found)?;
    let session = repositories::sessions::find_by_code(state.db(), &code)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load session"))?
        .ok_or_else(ApiError::session_not_found)?;

    if session.status.is_terminal() {
        return Ok(session);
    }

    let now = now_utc();
    let cutoff = idle_cutoff(now, state.settings().tutoring().session_idle_ttl_hours);
    if session.last_active_at >= cutoff {
        return Ok(session);
    }

    let expired = repositories::sessions::expire(state.db(), &session.id, cutoff, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to expire idle session"))?;
    if let Some(expired) = expired {
        tracing::info!(session_code = %expired.code, "Expired idle session on access");
        return Ok(expired);
    }

    // The row changed since it was read; return its current state.
    repositories::sessions::find_by_code(state.db(), &session.code)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to reload session"))?
        .ok_or_else(ApiError::session_not_found)
}

/// Sessions in a terminal state accept no further writes.
pub(super) fn ensure_writable(session: &TutoringSession) -> Result<(), ApiError> {
    if session.status.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "Session {} is {} and no longer accepts changes",
            session.code,
            session.status.as_str()
        )));
    }
    Ok(())
}

pub(super) async fn session_response(
    state: &AppState,
    session: TutoringSession,
    resumed: bool,
) -> Result<SessionResponse, ApiError> {
    let problems = repositories::problems::list_by_session(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load problems"))?;
    let transcript = repositories::transcript::list_by_session(state.db(), &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load transcript"))?;

    Ok(SessionResponse::build(session, problems, transcript, resumed))
}
