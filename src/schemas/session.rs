use serde::{Deserialize, Serialize};

use crate::core::time::format_timestamp;
use crate::db::models::{Problem, TranscriptEntry, TutoringSession};
use crate::db::types::SessionStatus;
use crate::schemas::chat::TranscriptEntryResponse;
use crate::schemas::problem::ProblemResponse;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CreateSessionRequest {
    #[serde(default)]
    pub(crate) session_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) session_code: String,
    pub(crate) status: SessionStatus,
    pub(crate) resumed: bool,
    pub(crate) resume_count: i32,
    pub(crate) current_problem_id: Option<String>,
    pub(crate) problems: Vec<ProblemResponse>,
    pub(crate) transcript: Vec<TranscriptEntryResponse>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) last_active_at: String,
}

impl SessionResponse {
    pub(crate) fn build(
        session: TutoringSession,
        problems: Vec<Problem>,
        transcript: Vec<TranscriptEntry>,
        resumed: bool,
    ) -> Self {
        let current = session.current_problem_id.as_deref();
        let problems = problems
            .into_iter()
            .map(|problem| ProblemResponse::from_problem(problem, current))
            .collect();

        Self {
            session_code: session.code,
            status: session.status,
            resumed,
            resume_count: session.resume_count,
            current_problem_id: session.current_problem_id,
            problems,
            transcript: transcript.into_iter().map(TranscriptEntryResponse::from).collect(),
            created_at: format_timestamp(session.created_at),
            updated_at: format_timestamp(session.updated_at),
            last_active_at: format_timestamp(session.last_active_at),
        }
    }
}
