use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::openai::LlmError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    UnprocessableEntity(String),
    TooManyRequests(&'static str),
    /// Failure reported by the LLM provider, relayed with the given status.
    Upstream(StatusCode, String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn session_not_found() -> Self {
        Self::NotFound("Session not found".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(status, _) => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Unauthorized => {
                ApiError::Upstream(StatusCode::UNAUTHORIZED, err.to_string())
            }
            LlmError::RateLimited => ApiError::TooManyRequests("LLM provider rate limit exceeded"),
            LlmError::Unreadable(message) => ApiError::UnprocessableEntity(message),
            LlmError::Provider { .. } | LlmError::Transport(_) | LlmError::InvalidResponse(_) => {
                ApiError::Upstream(StatusCode::BAD_GATEWAY, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::TooManyRequests(message) => message.to_string(),
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::UnprocessableEntity(message)
            | ApiError::Upstream(_, message)
            | ApiError::Internal(message) => message,
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %detail, "Request failed");
        }

        let mut response =
            (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response();
        if status == StatusCode::TOO_MANY_REQUESTS {
            response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from_static("60"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_auth_and_rate_limit_propagate() {
        let unauthorized = ApiError::from(LlmError::Unauthorized);
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

        let limited = ApiError::from(LlmError::RateLimited);
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        let response = limited.into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
    }

    #[test]
    fn other_llm_failures_are_bad_gateway() {
        let err = ApiError::from(LlmError::Provider { status: 500, detail: "boom".to_string() });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let err = ApiError::from(LlmError::InvalidResponse("no json".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn unreadable_image_is_unprocessable() {
        let err = ApiError::from(LlmError::Unreadable("too blurry".to_string()));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
