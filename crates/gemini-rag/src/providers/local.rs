//! Local vector store provider over the HNSW-indexed SQLite collection

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::storage::VectorCollection;
use crate::types::Chunk;

use super::vector_store::{VectorSearchResult, VectorStoreProvider};

/// Local vector store wrapping a persisted `VectorCollection`
pub struct LocalVectorStore {
    collection: Arc<VectorCollection>,
}

impl LocalVectorStore {
    /// Create from an open collection
    pub fn new(collection: Arc<VectorCollection>) -> Self {
        Self { collection }
    }

    /// Open (creating if absent) the configured collection and rebuild its index
    pub async fn open(config: &VectorDbConfig) -> Result<Self> {
        let config = config.clone();
        let collection = tokio::task::spawn_blocking(move || VectorCollection::open(&config))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;
        Ok(Self::new(Arc::new(collection)))
    }
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        let collection = self.collection.clone();
        let chunks = chunks.to_vec();
        tokio::task::spawn_blocking(move || collection.insert(&chunks))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorSearchResult>> {
        let collection = self.collection.clone();
        let query = query_embedding.to_vec();

        tokio::task::spawn_blocking(move || {
            let records = collection.query(&query, top_k)?;
            Ok(records
                .into_iter()
                .map(|r| {
                    let source = Chunk::source_from_metadata(&r.metadata);
                    let char_start = meta_usize(&r.metadata, "char_start");
                    let char_end = meta_usize(&r.metadata, "char_end");
                    let mut chunk =
                        Chunk::new(r.document_id, r.content, source, char_start, char_end, r.chunk_index);
                    chunk.id = r.id;
                    VectorSearchResult {
                        chunk,
                        similarity: r.similarity,
                    }
                })
                .collect())
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn len(&self) -> Result<usize> {
        let collection = self.collection.clone();
        tokio::task::spawn_blocking(move || collection.count())
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    fn collection(&self) -> &str {
        self.collection.name()
    }

    fn name(&self) -> &str {
        "local-hnsw"
    }
}

fn meta_usize(meta: &std::collections::HashMap<String, serde_json::Value>, key: &str) -> usize {
    meta.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkSource, FileType};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_search_rebuilds_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let config = VectorDbConfig {
            persist_dir: dir.path().to_path_buf(),
            ..VectorDbConfig::default()
        };
        let store = LocalVectorStore::open(&config).await.unwrap();
        assert_eq!(store.name(), "local-hnsw");
        assert!(store.is_empty().await.unwrap());

        let source = ChunkSource {
            filename: "facts.txt".to_string(),
            file_type: FileType::Txt,
            page_number: None,
        };
        let doc_id = Uuid::new_v4();
        let mut chunk = Chunk::new(doc_id, "Paris is in France.".to_string(), source.clone(), 5, 24, 0);
        chunk.embedding = vec![0.6, 0.8];

        assert_eq!(store.insert_chunks(&[chunk]).await.unwrap(), 1);
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.collection(), "quickstart");

        let results = store.search(&[0.6, 0.8], 2).await.unwrap();
        assert_eq!(results.len(), 1);
        let found = &results[0].chunk;
        assert_eq!(found.document_id, doc_id);
        assert_eq!(found.source, source);
        assert_eq!((found.char_start, found.char_end), (5, 24));
        assert!((results[0].similarity - 1.0).abs() < 1e-5);
    }
}
