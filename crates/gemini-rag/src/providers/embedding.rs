//! Embedding provider seam used for both chunk and query vectors

use async_trait::async_trait;
use crate::error::{Error, Result};

/// Turns text into fixed-dimension vectors.
///
/// `GeminiEmbedder` is the shipped implementation (`text-embedding-004`).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text (queries)
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts in order. Defaults to one `embed` call per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// `embed_batch` plus a check that one non-empty vector came back per text
    async fn embed_chunks(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.embed_batch(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(Error::embedding(format!(
                "{} returned {} embeddings for {} texts",
                self.name(),
                embeddings.len(),
                texts.len()
            )));
        }
        if embeddings.iter().any(|e| e.is_empty()) {
            return Err(Error::embedding(format!("{} returned an empty embedding", self.name())));
        }
        Ok(embeddings)
    }

    /// Provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drops the last text from every batch
    struct ShortBatch;

    #[async_trait]
    impl EmbeddingProvider for ShortBatch {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0]; texts.len().saturating_sub(1)])
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn test_embed_chunks_checks_count() {
        let texts = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            ShortBatch.embed_chunks(&texts).await,
            Err(Error::Embedding(_))
        ));
        assert_eq!(ShortBatch.embed_batch(&texts[..1]).await.unwrap().len(), 0);
    }
}
