//! Provider abstractions for embeddings, LLM and vector storage
//!
//! The engine only talks to these traits; Gemini and the local SQLite
//! collection are the shipped implementations.

pub mod embedding;
pub mod gemini;
pub mod llm;
pub mod local;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use gemini::{gemini_providers, GeminiClient, GeminiEmbedder, GeminiLlm};
pub use llm::LlmProvider;
pub use local::LocalVectorStore;
pub use vector_store::{VectorSearchResult, VectorStoreProvider};
