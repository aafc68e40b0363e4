use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::models::TranscriptEntry;

pub(crate) const COLUMNS: &str = "\
    id, session_id, problem_id, step_number, student_message, tutor_message, hints_used, \
    progress_made, stuck_turns, created_at";

pub(crate) struct CreateEntry<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) problem_id: &'a str,
    pub(crate) step_number: i32,
    pub(crate) student_message: &'a str,
    pub(crate) tutor_message: &'a str,
    pub(crate) hints_used: i32,
    pub(crate) progress_made: bool,
    pub(crate) stuck_turns: i32,
    pub(crate) created_at: OffsetDateTime,
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    entry: CreateEntry<'_>,
) -> Result<TranscriptEntry, sqlx::Error> {
    sqlx::query_as::<_, TranscriptEntry>(&format!(
        "INSERT INTO transcript_entries (
            id, session_id, problem_id, step_number, student_message, tutor_message,
            hints_used, progress_made, stuck_turns, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        RETURNING {COLUMNS}"
    ))
    .bind(entry.id)
    .bind(entry.session_id)
    .bind(entry.problem_id)
    .bind(entry.step_number)
    .bind(entry.student_message)
    .bind(entry.tutor_message)
    .bind(entry.hints_used)
    .bind(entry.progress_made)
    .bind(entry.stuck_turns)
    .bind(entry.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn max_step(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(MAX(step_number), 0) FROM transcript_entries WHERE session_id = $1",
    )
    .bind(session_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn latest_for_problem(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
    problem_id: &str,
) -> Result<Option<TranscriptEntry>, sqlx::Error> {
    sqlx::query_as::<_, TranscriptEntry>(&format!(
        "SELECT {COLUMNS} FROM transcript_entries
         WHERE session_id = $1 AND problem_id = $2
         ORDER BY step_number DESC LIMIT 1"
    ))
    .bind(session_id)
    .bind(problem_id)
    .fetch_optional(executor)
    .await
}

/// Most recent `limit` turns for a problem, returned oldest first.
pub(crate) async fn recent_for_problem(
    pool: &PgPool,
    session_id: &str,
    problem_id: &str,
    limit: i64,
) -> Result<Vec<TranscriptEntry>, sqlx::Error> {
    let mut entries = sqlx::query_as::<_, TranscriptEntry>(&format!(
        "SELECT {COLUMNS} FROM transcript_entries
         WHERE session_id = $1 AND problem_id = $2
         ORDER BY step_number DESC LIMIT $3"
    ))
    .bind(session_id)
    .bind(problem_id)
    .bind(limit.clamp(1, 200))
    .fetch_all(pool)
    .await?;
    entries.reverse();
    Ok(entries)
}

pub(crate) async fn list_by_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Vec<TranscriptEntry>, sqlx::Error> {
    sqlx::query_as::<_, TranscriptEntry>(&format!(
        "SELECT {COLUMNS} FROM transcript_entries WHERE session_id = $1 ORDER BY step_number"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await
}
