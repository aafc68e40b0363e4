use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::core::config::Settings;
use crate::db::models::TranscriptEntry;
use crate::db::types::DifficultyLevel;
use crate::services::openai::{LlmError, OpenAiClient};
use crate::services::prompts;

pub(crate) const UNCATEGORIZED: &str = "uncategorized";
const MAX_CATEGORY_CHARS: usize = 64;

/// Everything the model needs to answer one student message.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TutorTurn<'a> {
    pub(crate) problem: &'a str,
    pub(crate) history: &'a [TranscriptEntry],
    pub(crate) student_message: &'a str,
    pub(crate) hints_used: i32,
    pub(crate) stuck_turns: i32,
    pub(crate) escalate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TutorReply {
    pub(crate) tutor_message: String,
    pub(crate) progress_made: bool,
    pub(crate) gave_hint: bool,
    pub(crate) problem_solved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProblemClassification {
    pub(crate) category: String,
    pub(crate) difficulty: DifficultyLevel,
}

impl ProblemClassification {
    pub(crate) fn unclassified() -> Self {
        Self { category: UNCATEGORIZED.to_string(), difficulty: DifficultyLevel::Unknown }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ProblemImage {
    pub(crate) bytes: Vec<u8>,
    pub(crate) content_type: String,
}

impl ProblemImage {
    pub(crate) fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SimilarProblem {
    pub(crate) text: String,
    pub(crate) difficulty: DifficultyLevel,
}

#[async_trait]
pub(crate) trait TutorModel: Send + Sync {
    async fn tutor_reply(&self, turn: TutorTurn<'_>) -> Result<TutorReply, LlmError>;

    async fn classify_problem(&self, problem: &str) -> Result<ProblemClassification, LlmError>;

    async fn extract_problem(&self, image: &ProblemImage) -> Result<String, LlmError>;

    async fn similar_problems(
        &self,
        problem: &str,
        count: u32,
    ) -> Result<Vec<SimilarProblem>, LlmError>;
}

/// `TutorModel` backed by an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone)]
pub(crate) struct OpenAiTutor {
    client: OpenAiClient,
    model: String,
    vision_model: String,
}

impl OpenAiTutor {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            client: OpenAiClient::from_settings(settings)?,
            model: settings.ai().ai_model.clone(),
            vision_model: settings.ai().ai_vision_model.clone(),
        })
    }
}

#[async_trait]
impl TutorModel for OpenAiTutor {
    async fn tutor_reply(&self, turn: TutorTurn<'_>) -> Result<TutorReply, LlmError> {
        let messages = prompts::tutor_messages(
            turn.problem,
            turn.history,
            turn.student_message,
            turn.hints_used,
            turn.stuck_turns,
            turn.escalate,
        );
        let body = self.client.chat_json("tutor_reply", &self.model, messages).await?;
        parse_tutor_reply(&body)
    }

    async fn classify_problem(&self, problem: &str) -> Result<ProblemClassification, LlmError> {
        let messages = prompts::classify_messages(problem);
        let body = self.client.chat_json("classify_problem", &self.model, messages).await?;
        Ok(parse_classification(&body))
    }

    async fn extract_problem(&self, image: &ProblemImage) -> Result<String, LlmError> {
        let messages = prompts::extract_messages(&image.data_url());
        let body = self.client.chat_json("extract_problem", &self.vision_model, messages).await?;
        parse_extracted_problem(&body)
    }

    async fn similar_problems(
        &self,
        problem: &str,
        count: u32,
    ) -> Result<Vec<SimilarProblem>, LlmError> {
        let messages = prompts::similar_messages(problem, count);
        let body = self.client.chat_json("similar_problems", &self.model, messages).await?;
        parse_similar_problems(&body, count)
    }
}

fn flag(body: &Value, key: &str) -> bool {
    body.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn trimmed_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).map(str::trim).filter(|value| !value.is_empty())
}

pub(crate) fn parse_tutor_reply(body: &Value) -> Result<TutorReply, LlmError> {
    let tutor_message = trimmed_str(body, "tutor_message")
        .ok_or_else(|| LlmError::InvalidResponse("tutor_message is missing".to_string()))?;

    let problem_solved = flag(body, "problem_solved");
    Ok(TutorReply {
        tutor_message: tutor_message.to_string(),
        // A correct final answer is progress even if the model forgot to say so.
        progress_made: flag(body, "progress_made") || problem_solved,
        gave_hint: flag(body, "gave_hint"),
        problem_solved,
    })
}

pub(crate) fn parse_classification(body: &Value) -> ProblemClassification {
    let category = trimmed_str(body, "category")
        .map(|value| value.to_lowercase().chars().take(MAX_CATEGORY_CHARS).collect::<String>())
        .unwrap_or_else(|| UNCATEGORIZED.to_string());
    let difficulty = trimmed_str(body, "difficulty")
        .map(DifficultyLevel::from_label)
        .unwrap_or(DifficultyLevel::Unknown);

    ProblemClassification { category, difficulty }
}

pub(crate) fn parse_extracted_problem(body: &Value) -> Result<String, LlmError> {
    let readable = body.get("readable").and_then(Value::as_bool).unwrap_or(true);
    let text = trimmed_str(body, "problem_text");

    match (readable, text) {
        (true, Some(text)) => Ok(text.to_string()),
        _ => {
            let reason = trimmed_str(body, "reason").unwrap_or("no problem text found");
            Err(LlmError::Unreadable(format!(
                "Could not read a math problem from the image: {reason}"
            )))
        }
    }
}

pub(crate) fn parse_similar_problems(
    body: &Value,
    count: u32,
) -> Result<Vec<SimilarProblem>, LlmError> {
    let items = body
        .get("problems")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::InvalidResponse("problems array is missing".to_string()))?;

    let problems = items
        .iter()
        .filter_map(|item| {
            let text = trimmed_str(item, "text")?;
            let difficulty = trimmed_str(item, "difficulty")
                .map(DifficultyLevel::from_label)
                .unwrap_or(DifficultyLevel::Unknown);
            Some(SimilarProblem { text: text.to_string(), difficulty })
        })
        .take(count as usize)
        .collect::<Vec<_>>();

    if problems.is_empty() {
        return Err(LlmError::InvalidResponse("no similar problems returned".to_string()));
    }
    Ok(problems)
}
