//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;
use crate::types::Chunk;

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0 to 1.0, higher is more similar)
    pub similarity: f32,
}

/// Trait for a handle on one named vector collection
///
/// Implementations:
/// - `LocalVectorStore`: SQLite-persisted collection
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Append chunks (with embeddings) to the collection
    ///
    /// Returns the number of records written. Records are never replaced,
    /// so inserting the same chunk content twice stores it twice.
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<usize>;

    /// Search for the `top_k` most similar chunks
    async fn search(&self, query_embedding: &[f32], top_k: usize)
        -> Result<Vec<VectorSearchResult>>;

    /// Get total number of records stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Name of the collection this handle writes to
    fn collection(&self) -> &str;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
