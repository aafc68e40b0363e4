use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_timestamp;
use crate::db::models::TranscriptEntry;
use crate::services::conversation::ConversationContext;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ChatRequest {
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub(crate) message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatResponse {
    pub(crate) tutor_message: String,
    pub(crate) conversation_context: ConversationContext,
    pub(crate) problem_id: String,
    pub(crate) problem_solved: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct TranscriptEntryResponse {
    pub(crate) step_number: i32,
    pub(crate) problem_id: String,
    pub(crate) student_message: String,
    pub(crate) tutor_message: String,
    pub(crate) hints_used: i32,
    pub(crate) progress_made: bool,
    pub(crate) stuck_turns: i32,
    pub(crate) created_at: String,
}

impl From<TranscriptEntry> for TranscriptEntryResponse {
    fn from(entry: TranscriptEntry) -> Self {
        Self {
            step_number: entry.step_number,
            problem_id: entry.problem_id,
            student_message: entry.student_message,
            tutor_message: entry.tutor_message,
            hints_used: entry.hints_used,
            progress_made: entry.progress_made,
            stuck_turns: entry.stuck_turns,
            created_at: format_timestamp(entry.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TranscriptResponse {
    pub(crate) session_code: String,
    pub(crate) entries: Vec<TranscriptEntryResponse>,
}
