//! Core types for the RAG service

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkSource, Document, FileType};
pub use query::ChatRequest;
pub use response::{AnswerResult, ChatResponse, HealthResponse, IngestResult, UploadResponse};
