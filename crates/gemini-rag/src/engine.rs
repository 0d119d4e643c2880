//! Retrieval engine: ingestion into the persistent collection and question answering
//!
//! The engine owns at most one in-memory index handle. The handle moves
//! through two states:
//!
//! - `Unloaded` until the first query or ingestion,
//! - `Loaded` afterwards, re-opened on every ingestion so queries always see
//!   the latest write.
//!
//! Both transitions happen under a single async mutex.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{ChunkingConfig, RagConfig, VectorDbConfig};
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::ingestion::{FileParser, TextChunker};
use crate::providers::{
    gemini_providers, EmbeddingProvider, LlmProvider, LocalVectorStore, VectorStoreProvider,
};
use crate::types::response::EMPTY_RESPONSE;
use crate::types::{AnswerResult, Document, IngestResult};

/// In-memory index handle
enum IndexState {
    Unloaded,
    Loaded(Arc<dyn VectorStoreProvider>),
}

/// Orchestrates loader, embedder, vector store and LLM
pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    vector_db: VectorDbConfig,
    chunking: ChunkingConfig,
    similarity_top_k: usize,
    index: Mutex<IndexState>,
}

impl RetrievalEngine {
    /// Build the engine with Gemini providers.
    ///
    /// Fails with `Error::Config` when no API key is configured.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        config.require_api_key()?;
        let (embedder, llm) = gemini_providers(&config.gemini)?;

        tracing::info!(
            "Retrieval engine using {} (embeddings) and {} (generation)",
            config.gemini.embed_model,
            config.gemini.generate_model
        );

        Ok(Self::new(config, Arc::new(embedder), Arc::new(llm)))
    }

    /// Build the engine around explicit providers
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        tracing::debug!(
            "Retrieval engine providers: embedder={}, llm={}",
            embedder.name(),
            llm.name()
        );

        Self {
            embedder,
            llm,
            vector_db: config.vector_db.clone(),
            chunking: config.chunking.clone(),
            similarity_top_k: config.retrieval.similarity_top_k.max(1),
            index: Mutex::new(IndexState::Unloaded),
        }
    }

    /// Ingest a text or PDF file into the collection.
    ///
    /// Quota exhaustion is reported in the result rather than as an error.
    pub async fn ingest(&self, path: &Path) -> Result<IngestResult> {
        match self.ingest_file(path).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_quota_exhausted() => {
                tracing::warn!("Ingestion of {} hit provider quota: {}", path.display(), e);
                Ok(IngestResult::quota_exhausted())
            }
            Err(e) => Err(e),
        }
    }

    /// Answer a question from the collection.
    ///
    /// Quota exhaustion yields the apology text with `ErrorKind::QuotaExhausted`.
    pub async fn answer(&self, query: &str) -> Result<AnswerResult> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("Query must not be empty".to_string()));
        }

        match self.answer_query(query).await {
            Ok(text) => Ok(AnswerResult::answered(text)),
            Err(e) if e.is_quota_exhausted() => {
                tracing::warn!("Query hit provider quota: {}", e);
                Ok(AnswerResult::quota_exhausted())
            }
            Err(e) => Err(e),
        }
    }

    /// Whether an index handle is currently held
    pub async fn is_loaded(&self) -> bool {
        matches!(*self.index.lock().await, IndexState::Loaded(_))
    }

    /// Number of records in the collection (loads the handle if needed)
    pub async fn record_count(&self) -> Result<usize> {
        self.loaded_store().await?.len().await
    }

    async fn ingest_file(&self, path: &Path) -> Result<IngestResult> {
        let parsed = FileParser::load(path).await?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let mut doc = Document::new(filename, parsed.file_type.clone());
        doc.total_pages = parsed.total_pages;

        let chunker = TextChunker::new(self.chunking.chunk_size, self.chunking.chunk_overlap);
        let mut chunks = chunker.chunk_document(&doc, &parsed);
        if chunks.is_empty() {
            return Err(Error::file_parse(&doc.filename, "No text to index"));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_chunks(&texts).await?;
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        // Write and reload under the lock so no reader keeps a pre-write handle
        let mut index = self.index.lock().await;
        let store = self.open_store().await?;
        let written = store.insert_chunks(&chunks).await?;
        *index = IndexState::Loaded(store);
        drop(index);

        doc.total_chunks = written as u32;

        tracing::info!(
            "Ingested {} successfully ({} chunks into '{}', pages: {:?})",
            doc.filename,
            doc.total_chunks,
            self.vector_db.collection,
            doc.total_pages
        );

        Ok(IngestResult::ingested(doc, written))
    }

    async fn answer_query(&self, query: &str) -> Result<String> {
        let store = self.loaded_store().await?;

        let query_embedding = self.embedder.embed(query).await?;
        let results = store.search(&query_embedding, self.similarity_top_k).await?;

        if results.is_empty() {
            tracing::info!("No chunks retrieved for query, collection is empty");
            return Ok(EMPTY_RESPONSE.to_string());
        }

        tracing::debug!(
            "Retrieved {} chunks (best similarity {:.3})",
            results.len(),
            results[0].similarity
        );

        let context = PromptBuilder::build_context(&results);
        let prompt = PromptBuilder::build_qa_prompt(query, &context);
        self.llm.complete(&prompt).await
    }

    /// Current handle, opening the collection on first use
    async fn loaded_store(&self) -> Result<Arc<dyn VectorStoreProvider>> {
        let mut index = self.index.lock().await;
        match &*index {
            IndexState::Loaded(store) => Ok(Arc::clone(store)),
            IndexState::Unloaded => {
                let store = self.open_store().await?;
                tracing::info!(
                    "Loaded collection '{}' ({}) from {}",
                    store.collection(),
                    store.name(),
                    self.vector_db.persist_dir.display()
                );
                *index = IndexState::Loaded(Arc::clone(&store));
                Ok(store)
            }
        }
    }

    async fn open_store(&self) -> Result<Arc<dyn VectorStoreProvider>> {
        let store = LocalVectorStore::open(&self.vector_db).await?;
        Ok(Arc::new(store))
    }
}
