//! In-process fake providers shared by unit tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider};

/// Bag-of-words embedder: each lowercase word bumps one hashed dimension
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            let hash = word
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100_0000_01b3));
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Embedder that always fails with a fixed message
pub struct FailingEmbedder {
    message: String,
}

impl FailingEmbedder {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding(self.message.clone()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// LLM that answers with the context section of the prompt and counts calls
#[derive(Default)]
pub struct EchoLlm {
    calls: AtomicUsize,
}

impl EchoLlm {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for EchoLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let context = prompt
            .split("---------------------\n")
            .nth(1)
            .unwrap_or(prompt)
            .trim()
            .to_string();
        Ok(context)
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// LLM that always fails with a fixed message
pub struct FailingLlm {
    message: String,
}

impl FailingLlm {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(Error::llm(self.message.clone()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Shorthand for the common working pair
pub fn working_providers() -> (Arc<dyn EmbeddingProvider>, Arc<EchoLlm>) {
    (Arc::new(HashEmbedder::new(64)), Arc::new(EchoLlm::default()))
}
