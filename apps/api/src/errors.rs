use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Only request-level problems end up here. A stage that ran and failed is
/// recorded on the session as a [`StageError`] and returned with a 200.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "STAGE_LOCKED", msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Which external call a stage failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// Unsupported format, corrupt content, or I/O failure reading the upload.
    DocumentRead,
    /// Network failure, non-success status, or missing/invalid credential.
    Transport,
    /// Model reply held no recoverable JSON object.
    Parse,
    /// Voice model load or render failure.
    Synthesis,
}

impl fmt::Display for StageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageErrorKind::DocumentRead => "failed to read document",
            StageErrorKind::Transport => "LLM request failed",
            StageErrorKind::Parse => "could not parse model reply",
            StageErrorKind::Synthesis => "speech synthesis failed",
        };
        f.write_str(label)
    }
}

/// Failure of one pipeline stage, kept as a value on the session and shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct StageError {
    pub kind: StageErrorKind,
    pub message: String,
    /// The model's reply, verbatim, when it could not be parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl StageError {
    pub fn new(kind: StageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raw_output: None,
        }
    }

    pub fn document_read(message: impl Into<String>) -> Self {
        Self::new(StageErrorKind::DocumentRead, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(StageErrorKind::Transport, message)
    }

    pub fn parse(message: impl Into<String>, raw_output: impl Into<String>) -> Self {
        Self {
            kind: StageErrorKind::Parse,
            message: message.into(),
            raw_output: Some(raw_output.into()),
        }
    }

    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::new(StageErrorKind::Synthesis, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_display_prefixes_kind() {
        let err = StageError::document_read("stream did not contain valid UTF-8");
        assert_eq!(
            err.to_string(),
            "failed to read document: stream did not contain valid UTF-8"
        );
    }

    #[test]
    fn test_stage_error_serializes_raw_output_only_when_present() {
        let transport = serde_json::to_value(StageError::transport("boom")).unwrap();
        assert_eq!(transport["kind"], "transport");
        assert!(transport.get("raw_output").is_none());

        let parse = serde_json::to_value(StageError::parse("No valid JSON detected", "hi")).unwrap();
        assert_eq!(parse["kind"], "parse");
        assert_eq!(parse["raw_output"], "hi");
    }

    #[tokio::test]
    async fn test_conflict_maps_to_409_with_code() {
        let response = AppError::Conflict("upload first".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "STAGE_LOCKED");
        assert_eq!(body["error"]["message"], "upload first");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!text.contains("disk on fire"));
    }
}
