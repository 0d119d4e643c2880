//! Document and chunk types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a file name or path
    pub fn from_filename(filename: &str) -> Self {
        std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if file type can be loaded
    pub fn is_supported(&self) -> bool {
        match self {
            Self::Pdf => cfg!(feature = "pdf"),
            Self::Txt | Self::Markdown => true,
            Self::Unknown => false,
        }
    }
}

/// A document being ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// File name the document was loaded from
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Page count (PDF only)
    pub total_pages: Option<u32>,
    /// Number of chunks written to the collection
    pub total_chunks: u32,
}

impl Document {
    /// Create a new document record
    pub fn new(filename: String, file_type: FileType) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            file_type,
            total_pages: None,
            total_chunks: 0,
        }
    }
}

/// Where a chunk came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSource {
    /// Source file name
    pub filename: String,
    /// Source file type
    pub file_type: FileType,
    /// Page number, when the loader tracks pages
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub page_number: Option<u32>,
}

/// A chunk of text with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information
    pub source: ChunkSource,
    /// Character position in original document
    pub char_start: usize,
    pub char_end: usize,
    /// Chunk index within document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        char_start: usize,
        char_end: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            char_start,
            char_end,
            chunk_index,
        }
    }

    /// Metadata stored alongside the vector
    pub fn to_vector_metadata(&self) -> HashMap<String, serde_json::Value> {
        let mut meta = HashMap::new();
        meta.insert("filename".to_string(), serde_json::json!(self.source.filename));
        meta.insert("file_type".to_string(), serde_json::json!(self.source.file_type));
        meta.insert("char_start".to_string(), serde_json::json!(self.char_start));
        meta.insert("char_end".to_string(), serde_json::json!(self.char_end));

        if let Some(page) = self.source.page_number {
            meta.insert("page_number".to_string(), serde_json::json!(page));
        }

        meta
    }

    /// Rebuild source information from stored metadata
    pub fn source_from_metadata(meta: &HashMap<String, serde_json::Value>) -> ChunkSource {
        ChunkSource {
            filename: meta
                .get("filename")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            file_type: meta
                .get("file_type")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or(FileType::Unknown),
            page_number: meta
                .get("page_number")
                .and_then(|v| v.as_u64())
                .map(|p| p as u32),
        }
    }
}
