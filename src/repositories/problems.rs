use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::models::Problem;
use crate::db::types::{DifficultyLevel, ProblemSource, ProblemStatus};

pub(crate) const COLUMNS: &str = "\
    id, session_id, order_index, text, source, category, difficulty, status, solved_at, \
    created_at";

pub(crate) struct CreateProblem<'a> {
    pub(crate) id: &'a str,
    pub(crate) session_id: &'a str,
    pub(crate) text: &'a str,
    pub(crate) source: ProblemSource,
    pub(crate) category: &'a str,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) created_at: OffsetDateTime,
}

/// Appends a problem at the end of the session's list. Callers hold the
/// session row lock, which keeps `order_index` gap-free.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    problem: CreateProblem<'_>,
) -> Result<Problem, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "INSERT INTO problems (
            id, session_id, order_index, text, source, category, difficulty, status, created_at
        ) VALUES (
            $1, $2,
            (SELECT COALESCE(MAX(order_index), -1) + 1 FROM problems WHERE session_id = $2),
            $3, $4, $5, $6, $7, $8
        )
        RETURNING {COLUMNS}"
    ))
    .bind(problem.id)
    .bind(problem.session_id)
    .bind(problem.text)
    .bind(problem.source)
    .bind(problem.category)
    .bind(problem.difficulty)
    .bind(ProblemStatus::Open)
    .bind(problem.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_in_session(
    executor: impl sqlx::PgExecutor<'_>,
    session_id: &str,
    problem_id: &str,
) -> Result<Option<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "SELECT {COLUMNS} FROM problems WHERE session_id = $1 AND id = $2"
    ))
    .bind(session_id)
    .bind(problem_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Vec<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "SELECT {COLUMNS} FROM problems WHERE session_id = $1 ORDER BY order_index"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn mark_solved(
    executor: impl sqlx::PgExecutor<'_>,
    problem_id: &str,
    now: OffsetDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE problems SET status = $1, solved_at = $2 WHERE id = $3 AND status = $4")
        .bind(ProblemStatus::Solved)
        .bind(now)
        .bind(problem_id)
        .bind(ProblemStatus::Open)
        .execute(executor)
        .await?;
    Ok(())
}
