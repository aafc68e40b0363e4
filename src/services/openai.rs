use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::Settings;
use crate::core::metrics::{LLM_REQUESTS_TOTAL, LLM_REQUEST_DURATION};

#[derive(Debug, Error)]
pub(crate) enum LlmError {
    #[error("LLM provider rejected the API key")]
    Unauthorized,
    #[error("LLM provider rate limit exceeded")]
    RateLimited,
    #[error("LLM provider returned {status}: {detail}")]
    Provider { status: u16, detail: String },
    #[error("failed to reach LLM provider: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected LLM response: {0}")]
    InvalidResponse(String),
    #[error("{0}")]
    Unreadable(String),
}

impl LlmError {
    fn outcome_label(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::Provider { .. } => "provider_error",
            Self::Transport(_) => "transport_error",
            Self::InvalidResponse(_) | Self::Unreadable(_) => "invalid_response",
        }
    }
}

/// Thin client for an OpenAI-compatible `/chat/completions` endpoint that
/// always asks for a JSON object back. Calls are made once; failures are
/// surfaced to the caller untouched.
#[derive(Debug, Clone)]
pub(crate) struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiClient {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            max_tokens: settings.ai().ai_max_tokens,
            temperature: settings.ai().ai_temperature,
        })
    }

    pub(crate) async fn chat_json(
        &self,
        operation: &'static str,
        model: &str,
        messages: Vec<Value>,
    ) -> Result<Value, LlmError> {
        let timer = Instant::now();
        let result = self.send_chat(model, messages).await;
        let elapsed = timer.elapsed().as_secs_f64();

        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.outcome_label(),
        };
        metrics::counter!(LLM_REQUESTS_TOTAL, "operation" => operation, "outcome" => outcome)
            .increment(1);
        metrics::histogram!(LLM_REQUEST_DURATION, "operation" => operation).record(elapsed);

        match &result {
            Ok(_) => tracing::debug!(operation, model, duration_seconds = elapsed, "LLM call ok"),
            Err(err) => tracing::warn!(
                operation,
                model,
                duration_seconds = elapsed,
                error = %err,
                "LLM call failed"
            ),
        }

        result
    }

    async fn send_chat(&self, model: &str, messages: Vec<Value>) -> Result<Value, LlmError> {
        let payload = json!({
            "model": model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response =
            self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let content = extract_message_content(&body)?;
        let tokens_used = body
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(Value::as_u64);
        tracing::debug!(tokens_used, "LLM usage");

        serde_json::from_str(content)
            .map_err(|err| LlmError::InvalidResponse(format!("content is not JSON: {err}")))
    }
}

/// Maps a non-success provider status to an error, keeping 401 and 429
/// distinguishable.
pub(crate) fn status_error(status: StatusCode, body: &Value) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED => LlmError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited,
        other => LlmError::Provider { status: other.as_u16(), detail: provider_detail(body) },
    }
}

fn provider_detail(body: &Value) -> String {
    body.get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| "no error message".to_string())
}

pub(crate) fn extract_message_content(body: &Value) -> Result<&str, LlmError> {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".to_string()))
}
