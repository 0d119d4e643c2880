//! Request bodies

use serde::{Deserialize, Serialize};

/// Body of `POST /chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The question to answer
    pub query: String,
}
