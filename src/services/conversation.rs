use serde::Serialize;

use crate::db::models::TranscriptEntry;
use crate::services::tutor_model::TutorReply;

/// Progress metadata returned with every chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct ConversationContext {
    pub(crate) step_number: i32,
    pub(crate) hints_used: i32,
    pub(crate) progress_made: bool,
    pub(crate) stuck_turns: i32,
}

/// Per-problem counters carried from one turn to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ProblemProgress {
    pub(crate) hints_used: i32,
    pub(crate) stuck_turns: i32,
}

impl ProblemProgress {
    /// Counters after the most recent turn on the problem; zero if none.
    pub(crate) fn after(entry: Option<&TranscriptEntry>) -> Self {
        entry
            .map(|entry| Self { hints_used: entry.hints_used, stuck_turns: entry.stuck_turns })
            .unwrap_or_default()
    }

    pub(crate) fn should_escalate(self, stuck_turn_threshold: i32) -> bool {
        self.stuck_turns >= stuck_turn_threshold
    }
}

/// Folds a tutor reply into the counters. `last_step` is the highest step
/// already recorded for the session (0 when the transcript is empty).
pub(crate) fn next_context(
    last_step: i32,
    previous: ProblemProgress,
    reply: &TutorReply,
) -> ConversationContext {
    let hints_used = previous.hints_used + i32::from(reply.gave_hint);
    let stuck_turns = if reply.progress_made { 0 } else { previous.stuck_turns + 1 };

    ConversationContext {
        step_number: last_step + 1,
        hints_used,
        progress_made: reply.progress_made,
        stuck_turns,
    }
}
