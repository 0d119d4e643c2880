//! Response bodies and engine results

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::types::Document;

/// Apology returned from `/chat` when the provider quota is exhausted
pub const CHAT_QUOTA_APOLOGY: &str = "My cognitive batteries are drained (API Quota Exhausted). Please give me a moment to recharge or check your plan.";

/// Apology returned from `/upload` when the provider quota is exhausted
pub const UPLOAD_QUOTA_APOLOGY: &str = "My cognitive batteries are drained (API Quota Exhausted). Please give me a moment to recharge.";

/// Placeholder reasoning attached to normal answers
pub const REASONING_PLACEHOLDER: &str = "Processed based on knowledge base.";

/// Reasoning attached to quota apologies
pub const REASONING_QUOTA: &str = "API Quota Exhausted";

/// Answer text used when retrieval finds nothing to synthesize from
pub const EMPTY_RESPONSE: &str = "Empty Response";

/// Liveness message for `GET /`
pub const LIVENESS_MESSAGE: &str = "Gemini RAG API is running";

/// Outcome of `RetrievalEngine::answer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    /// Synthesized answer, or the apology when quota ran out
    pub text: String,
    /// Classification of any swallowed error
    pub error_kind: ErrorKind,
}

impl AnswerResult {
    /// Successful answer
    pub fn answered(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error_kind: ErrorKind::None,
        }
    }

    /// Quota apology in place of an answer
    pub fn quota_exhausted() -> Self {
        Self {
            text: CHAT_QUOTA_APOLOGY.to_string(),
            error_kind: ErrorKind::QuotaExhausted,
        }
    }
}

/// Outcome of `RetrievalEngine::ingest`
#[derive(Debug, Clone)]
pub struct IngestResult {
    /// Document record (absent when ingestion was cut short by quota)
    pub document: Option<Document>,
    /// Number of records appended to the collection
    pub chunks_created: usize,
    /// Classification of any swallowed error
    pub error_kind: ErrorKind,
    /// Apology text when `error_kind` is not `None`
    pub message: Option<String>,
}

impl IngestResult {
    /// Successful ingestion
    pub fn ingested(document: Document, chunks_created: usize) -> Self {
        Self {
            document: Some(document),
            chunks_created,
            error_kind: ErrorKind::None,
            message: None,
        }
    }

    /// Quota apology in place of ingestion
    pub fn quota_exhausted() -> Self {
        Self {
            document: None,
            chunks_created: 0,
            error_kind: ErrorKind::QuotaExhausted,
            message: Some(UPLOAD_QUOTA_APOLOGY.to_string()),
        }
    }
}

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub reasoning: String,
}

impl From<AnswerResult> for ChatResponse {
    fn from(result: AnswerResult) -> Self {
        let reasoning = match result.error_kind {
            ErrorKind::QuotaExhausted => REASONING_QUOTA,
            ErrorKind::None => REASONING_PLACEHOLDER,
        };
        Self {
            answer: result.text,
            reasoning: reasoning.to_string(),
        }
    }
}

/// Body of `POST /upload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Only set on the soft-error path
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<String>,
    pub message: String,
}

impl UploadResponse {
    /// Success body
    pub fn processed(filename: &str) -> Self {
        Self {
            status: None,
            message: format!("Successfully processed {}", filename),
        }
    }

    /// Soft error body for quota exhaustion
    pub fn quota_exhausted() -> Self {
        Self {
            status: Some("error".to_string()),
            message: UPLOAD_QUOTA_APOLOGY.to_string(),
        }
    }
}

/// Body of `GET /`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            message: LIVENESS_MESSAGE.to_string(),
        }
    }
}
