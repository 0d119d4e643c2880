//! Error types for the RAG service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Substrings that mark a provider failure as quota exhaustion when no
/// structured kind is available.
const QUOTA_MARKERS: [&str; 3] = ["429", "ResourceExhausted", "Quota"];

/// RAG service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, bad value)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider reported a rate limit or exhausted quota
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Caller supplied bad input (missing upload, empty query)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector database error
    #[error("Vector database error: {0}")]
    VectorDb(String),

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Binary classification surfaced to callers of the engine and gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No error worth surfacing
    #[default]
    None,
    /// Provider quota or rate limit hit
    QuotaExhausted,
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error.
    ///
    /// The structured `QuotaExhausted` variant wins; otherwise the rendered
    /// message is scanned for the provider's rate-limit markers.
    pub fn kind(&self) -> ErrorKind {
        if matches!(self, Error::QuotaExhausted(_)) {
            return ErrorKind::QuotaExhausted;
        }
        if let Error::Http(err) = self {
            if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
                return ErrorKind::QuotaExhausted;
            }
        }
        classify_message(&self.to_string())
    }

    /// Shorthand for `kind() == ErrorKind::QuotaExhausted`
    pub fn is_quota_exhausted(&self) -> bool {
        self.kind() == ErrorKind::QuotaExhausted
    }

    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::QuotaExhausted(_) => (StatusCode::TOO_MANY_REQUESTS, "quota_exhausted"),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Error::FileParse { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "parse_error"),
            Error::UnsupportedFileType(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "unsupported_type")
            }
            Error::Embedding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error"),
            Error::VectorDb(_) => (StatusCode::INTERNAL_SERVER_ERROR, "vector_db_error"),
            Error::Llm(_) => (StatusCode::INTERNAL_SERVER_ERROR, "llm_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::INTERNAL_SERVER_ERROR, "json_error"),
            Error::Http(_) => (StatusCode::INTERNAL_SERVER_ERROR, "http_error"),
            Error::Sqlite(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Substring fallback for providers that only hand back a message
pub fn classify_message(message: &str) -> ErrorKind {
    if QUOTA_MARKERS.iter().any(|marker| message.contains(marker)) {
        ErrorKind::QuotaExhausted
    } else {
        ErrorKind::None
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();
        let message = self.to_string();

        let body = Json(json!({
            "detail": message,
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_quota_kind() {
        let err = Error::QuotaExhausted("per-minute limit".to_string());
        assert_eq!(err.kind(), ErrorKind::QuotaExhausted);
    }

    #[test]
    fn test_message_markers() {
        for msg in ["429 RESOURCE_EXHAUSTED", "google.api_core.ResourceExhausted", "Quota exceeded"] {
            assert_eq!(Error::embedding(msg).kind(), ErrorKind::QuotaExhausted, "{msg}");
        }
        assert_eq!(Error::llm("connection reset").kind(), ErrorKind::None);
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        assert_eq!(classify_message("quota"), ErrorKind::None);
        assert_eq!(classify_message("resource exhausted"), ErrorKind::None);
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = Error::InvalidInput("No file uploaded".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["type"], "invalid_input");
        assert!(body["detail"].as_str().unwrap().contains("No file uploaded"));
    }
}
