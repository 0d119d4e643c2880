//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;

/// Trait for LLM text completion
///
/// Implementations:
/// - `GeminiLlm`: Gemini API (gemini-2.5-flash)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a fully assembled prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
