use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::db::types::{DifficultyLevel, ProblemSource, ProblemStatus, SessionStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TutoringSession {
    pub(crate) id: String,
    pub(crate) code: String,
    pub(crate) status: SessionStatus,
    pub(crate) current_problem_id: Option<String>,
    pub(crate) resume_count: i32,
    pub(crate) last_active_at: OffsetDateTime,
    pub(crate) closed_at: Option<OffsetDateTime>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Problem {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) order_index: i32,
    pub(crate) text: String,
    pub(crate) source: ProblemSource,
    pub(crate) category: String,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) status: ProblemStatus,
    pub(crate) solved_at: Option<OffsetDateTime>,
    pub(crate) created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TranscriptEntry {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) problem_id: String,
    pub(crate) step_number: i32,
    pub(crate) student_message: String,
    pub(crate) tutor_message: String,
    pub(crate) hints_used: i32,
    pub(crate) progress_made: bool,
    pub(crate) stuck_turns: i32,
    pub(crate) created_at: OffsetDateTime,
}
