use anyhow::{Context, Result};

use crate::core::metrics::SESSIONS_EXPIRED_TOTAL;
use crate::core::state::AppState;
use crate::core::time::{idle_cutoff, now_utc};
use crate::repositories;

/// Moves every non-terminal session idle past the TTL to `expired`.
pub(crate) async fn expire_idle_sessions(state: &AppState) -> Result<u64> {
    let now = now_utc();
    let cutoff = idle_cutoff(now, state.settings().tutoring().session_idle_ttl_hours);

    let expired = repositories::sessions::expire_idle(state.db(), cutoff, now)
        .await
        .context("Failed to expire idle sessions")?;

    if expired > 0 {
        tracing::info!(expired_sessions = expired, "Expired idle sessions");
    }
    metrics::counter!(SESSIONS_EXPIRED_TOTAL).increment(expired);

    Ok(expired)
}
