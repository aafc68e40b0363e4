use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::models::TutoringSession;
use crate::db::types::SessionStatus;

pub(crate) const COLUMNS: &str = "\
    id, code, status, current_problem_id, resume_count, last_active_at, closed_at, \
    created_at, updated_at";

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) code: &'a str,
    pub(crate) now: OffsetDateTime,
}

/// Inserts a new session. Returns `None` when the code is already taken so the
/// caller can draw another one.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    session: CreateSession<'_>,
) -> Result<Option<TutoringSession>, sqlx::Error> {
    sqlx::query_as::<_, TutoringSession>(&format!(
        "INSERT INTO tutoring_sessions (
            id, code, status, resume_count, last_active_at, created_at, updated_at
        ) VALUES ($1,$2,$3,0,$4,$4,$4)
        ON CONFLICT (code) DO NOTHING
        RETURNING {COLUMNS}"
    ))
    .bind(session.id)
    .bind(session.code)
    .bind(SessionStatus::Created)
    .bind(session.now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_code(
    executor: impl sqlx::PgExecutor<'_>,
    code: &str,
) -> Result<Option<TutoringSession>, sqlx::Error> {
    sqlx::query_as::<_, TutoringSession>(&format!(
        "SELECT {COLUMNS} FROM tutoring_sessions WHERE code = $1"
    ))
    .bind(code)
    .fetch_optional(executor)
    .await
}

/// Row-locks the session for the rest of the transaction.
pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<TutoringSession, sqlx::Error> {
    sqlx::query_as::<_, TutoringSession>(&format!(
        "SELECT {COLUMNS} FROM tutoring_sessions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn mark_resumed(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: OffsetDateTime,
) -> Result<TutoringSession, sqlx::Error> {
    sqlx::query_as::<_, TutoringSession>(&format!(
        "UPDATE tutoring_sessions
         SET status = $1, resume_count = resume_count + 1, last_active_at = $2, updated_at = $2
         WHERE id = $3
         RETURNING {COLUMNS}"
    ))
    .bind(SessionStatus::Resumed)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Records activity: status becomes `active` and, when given, the current
/// problem moves.
pub(crate) async fn touch_active(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    current_problem_id: Option<&str>,
    now: OffsetDateTime,
) -> Result<TutoringSession, sqlx::Error> {
    sqlx::query_as::<_, TutoringSession>(&format!(
        "UPDATE tutoring_sessions
         SET status = $1,
             current_problem_id = COALESCE($2, current_problem_id),
             last_active_at = $3,
             updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(SessionStatus::Active)
    .bind(current_problem_id)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn close(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: OffsetDateTime,
) -> Result<TutoringSession, sqlx::Error> {
    sqlx::query_as::<_, TutoringSession>(&format!(
        "UPDATE tutoring_sessions
         SET status = $1, closed_at = $2, updated_at = $2
         WHERE id = $3
         RETURNING {COLUMNS}"
    ))
    .bind(SessionStatus::Closed)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Expires one session if it is still open and idle since before `cutoff`.
/// Returns `None` when a concurrent close or activity got there first.
pub(crate) async fn expire(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    cutoff: OffsetDateTime,
    now: OffsetDateTime,
) -> Result<Option<TutoringSession>, sqlx::Error> {
    sqlx::query_as::<_, TutoringSession>(&format!(
        "UPDATE tutoring_sessions SET status = $1, updated_at = $2
         WHERE id = $3 AND status IN ($4, $5, $6) AND last_active_at < $7
         RETURNING {COLUMNS}"
    ))
    .bind(SessionStatus::Expired)
    .bind(now)
    .bind(id)
    .bind(SessionStatus::Created)
    .bind(SessionStatus::Active)
    .bind(SessionStatus::Resumed)
    .bind(cutoff)
    .fetch_optional(executor)
    .await
}

/// Bulk-expires every non-terminal session idle since before `cutoff`.
pub(crate) async fn expire_idle(
    pool: &PgPool,
    cutoff: OffsetDateTime,
    now: OffsetDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE tutoring_sessions SET status = $1, updated_at = $2
         WHERE status IN ($3, $4, $5) AND last_active_at < $6",
    )
    .bind(SessionStatus::Expired)
    .bind(now)
    .bind(SessionStatus::Created)
    .bind(SessionStatus::Active)
    .bind(SessionStatus::Resumed)
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
pub(crate) async fn set_last_active(
    pool: &PgPool,
    id: &str,
    last_active_at: OffsetDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE tutoring_sessions SET last_active_at = $1 WHERE id = $2")
        .bind(last_active_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
