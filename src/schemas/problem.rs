use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_timestamp;
use crate::db::models::Problem;
use crate::db::types::{DifficultyLevel, ProblemSource, ProblemStatus};
use crate::services::tutor_model::SimilarProblem;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitProblemRequest {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemResponse {
    pub(crate) id: String,
    pub(crate) order_index: i32,
    pub(crate) text: String,
    pub(crate) source: ProblemSource,
    pub(crate) category: String,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) status: ProblemStatus,
    pub(crate) is_current: bool,
    pub(crate) created_at: String,
    pub(crate) solved_at: Option<String>,
}

impl ProblemResponse {
    pub(crate) fn from_problem(problem: Problem, current_problem_id: Option<&str>) -> Self {
        let is_current = current_problem_id == Some(problem.id.as_str());
        Self {
            id: problem.id,
            order_index: problem.order_index,
            text: problem.text,
            source: problem.source,
            category: problem.category,
            difficulty: problem.difficulty,
            status: problem.status,
            is_current,
            created_at: format_timestamp(problem.created_at),
            solved_at: problem.solved_at.map(format_timestamp),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SimilarProblemsQuery {
    #[serde(default)]
    #[validate(range(min = 1, max = 10, message = "count must be in range 1..10"))]
    pub(crate) count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SimilarProblemsResponse {
    pub(crate) problem_id: String,
    pub(crate) problems: Vec<SimilarProblem>,
}
