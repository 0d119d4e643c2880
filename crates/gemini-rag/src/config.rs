//! Configuration for the RAG service
//!
//! Values are layered: compiled defaults, then an optional TOML file named by
//! `RAG_CONFIG`, then individual environment overrides. The Gemini API key is
//! only ever read from `GOOGLE_API_KEY`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "RAG_CONFIG";
/// Name of the single collection every document is written into
pub const COLLECTION_NAME: &str = "quickstart";

/// Main RAG service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Gemini provider configuration
    pub gemini: GeminiConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Vector collection configuration
    pub vector_db: VectorDbConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from `RAG_CONFIG` (if set) and the environment
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV) {
            self.gemini.api_key = Some(key);
        }
        if let Some(host) = lookup("RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("RAG_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid RAG_PORT '{}': {}", port, e)))?;
        }
        if let Some(dir) = lookup("RAG_PERSIST_DIR") {
            self.vector_db.persist_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("RAG_KNOWLEDGE_BASE") {
            self.server.knowledge_base_path = PathBuf::from(path);
        }
        if let Some(model) = lookup("GEMINI_EMBED_MODEL") {
            self.gemini.embed_model = model;
        }
        if let Some(model) = lookup("GEMINI_LLM_MODEL") {
            self.gemini.generate_model = model;
        }
        Ok(())
    }

    /// Return the API key, failing if it is missing or blank
    pub fn require_api_key(&self) -> Result<&str> {
        match self.gemini.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::Config(format!(
                "{} not found in environment variables",
                API_KEY_ENV
            ))),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
    /// Directory for scoped temporary upload files
    pub upload_dir: PathBuf,
    /// Document ingested automatically at startup when present
    pub knowledge_base_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_size: 100 * 1024 * 1024, // 100MB
            upload_dir: std::env::temp_dir(),
            knowledge_base_path: PathBuf::from("knowledge_base.md"),
        }
    }
}

/// Gemini (Generative Language API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key, normally supplied through `GOOGLE_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            embed_model: "models/text-embedding-004".to_string(),
            generate_model: "models/gemini-2.5-flash".to_string(),
            temperature: 0.1,
            timeout_secs: 120,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
        }
    }
}

/// Vector collection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Directory holding the collection database
    pub persist_dir: PathBuf,
    /// Collection name
    pub collection: String,
    /// HNSW max connections per node
    pub hnsw_m: usize,
    /// HNSW ef parameter during construction
    pub hnsw_ef_construction: usize,
    /// HNSW ef parameter during search
    pub hnsw_ef_search: usize,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from("chroma_db"),
            collection: COLLECTION_NAME.to_string(),
            hnsw_m: 32,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 100,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the LLM per query
    pub similarity_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { similarity_top_k: 2 }
    }
}
