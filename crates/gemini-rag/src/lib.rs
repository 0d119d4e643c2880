//! gemini-rag: minimal retrieval-augmented question answering over uploaded documents
//!
//! Documents (plain text, Markdown, PDF) are chunked, embedded with Gemini and
//! persisted in a local vector collection. Questions are answered by Gemini
//! from the most similar chunks. An axum gateway exposes upload and chat.

pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod server;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::RagConfig;
pub use engine::RetrievalEngine;
pub use error::{Error, ErrorKind, Result};
pub use types::{
    document::{Chunk, ChunkSource, Document, FileType},
    query::ChatRequest,
    response::{AnswerResult, ChatResponse, IngestResult, UploadResponse},
};
