//! SQLite-persisted vector collection searched through an HNSW index
//!
//! Records are `(id, vector, source text, metadata)` rows grouped by
//! collection name. Opening a collection rebuilds its in-memory HNSW graph
//! from the stored vectors; inserts go to both.

use chrono::Utc;
use hnsw_rs::prelude::{DistCosine, Hnsw};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::types::Chunk;

/// File name of the collection database inside the persist directory
pub const DATABASE_FILE: &str = "chroma.sqlite3";

/// Layer count of the HNSW graph (the hnsw_rs maximum)
const HNSW_MAX_LAYERS: usize = 16;

/// Lower bound for the element count hint given to the HNSW graph
const HNSW_MIN_CAPACITY: usize = 10_000;

/// HNSW tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HnswParams {
    /// Max connections per node
    pub m: usize,
    /// ef during construction
    pub ef_construction: usize,
    /// ef during search (raised to `top_k` when smaller)
    pub ef_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::from(&VectorDbConfig::default())
    }
}

impl From<&VectorDbConfig> for HnswParams {
    fn from(config: &VectorDbConfig) -> Self {
        Self {
            m: config.hnsw_m,
            ef_construction: config.hnsw_ef_construction,
            ef_search: config.hnsw_ef_search,
        }
    }
}

/// A record read back from the collection
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Opaque record ID assigned at insert
    pub id: Uuid,
    /// Document the record was ingested from
    pub document_id: Uuid,
    /// Chunk index within that document
    pub chunk_index: u32,
    /// Source text
    pub content: String,
    /// Metadata stored with the vector
    pub metadata: HashMap<String, serde_json::Value>,
    /// Cosine similarity to the query
    pub similarity: f32,
}

/// Handle on one named collection in the database
pub struct VectorCollection {
    conn: Arc<Mutex<Connection>>,
    /// Keyed by SQLite rowid
    index: Hnsw<'static, f32, DistCosine>,
    indexed: AtomicUsize,
    params: HnswParams,
    name: String,
    path: Option<PathBuf>,
}

impl VectorCollection {
    /// Open the database under `config.persist_dir` and get or create `config.collection`
    pub fn open(config: &VectorDbConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.persist_dir)?;
        let path = config.persist_dir.join(DATABASE_FILE);

        let conn = Connection::open(&path)
            .map_err(|e| Error::vector_db(format!("Failed to open {}: {}", path.display(), e)))?;

        Self::init(conn, &config.collection, Some(path), HnswParams::from(config))
    }

    /// Create an in-memory collection (for testing)
    #[cfg(test)]
    pub fn in_memory(name: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, name, None, HnswParams::default())
    }

    fn init(conn: Connection, name: &str, path: Option<PathBuf>, params: HnswParams) -> Result<Self> {
        migrate(&conn)?;
        conn.execute(
            "INSERT OR IGNORE INTO collections (name, dimensions, created_at) VALUES (?1, NULL, ?2)",
            params![name, Utc::now().to_rfc3339()],
        )?;

        let stored = load_vectors(&conn, name)?;
        let index = Hnsw::new(
            params.m,
            (stored.len() * 2).max(HNSW_MIN_CAPACITY),
            HNSW_MAX_LAYERS,
            params.ef_construction,
            DistCosine {},
        );
        for (rowid, vector) in &stored {
            index.insert_slice((vector.as_slice(), *rowid as usize));
        }

        tracing::debug!("Indexed {} vectors for collection '{}'", stored.len(), name);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            index,
            indexed: AtomicUsize::new(stored.len()),
            params,
            name: name.to_string(),
            path,
        })
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database file path (None for in-memory collections)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Dimensions fixed by the first insert, if any
    pub fn dimensions(&self) -> Result<Option<usize>> {
        let conn = self.conn.lock();
        let dims: Option<i64> = conn
            .query_row(
                "SELECT dimensions FROM collections WHERE name = ?1",
                params![self.name],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(dims.map(|d| d as usize))
    }

    /// Append chunks in one transaction, then index them. Returns the number of rows written.
    pub fn insert(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let dims = chunks[0].embedding.len();
        if dims == 0 {
            return Err(Error::vector_db("Chunk has no embedding"));
        }
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dims) {
            return Err(Error::vector_db(format!(
                "Chunk {} has {} dimensions, expected {}",
                bad.chunk_index,
                bad.embedding.len(),
                dims
            )));
        }
        if let Some(existing) = self.dimensions()? {
            if existing != dims {
                return Err(Error::vector_db(format!(
                    "Collection '{}' holds {}-dimensional vectors, got {}",
                    self.name, existing, dims
                )));
            }
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE collections SET dimensions = ?2 WHERE name = ?1 AND dimensions IS NULL",
            params![self.name, dims as i64],
        )?;

        let now = Utc::now().to_rfc3339();
        let mut rowids = Vec::with_capacity(chunks.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO embeddings
                    (id, collection, document_id, chunk_index, content, metadata, embedding, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;

            for chunk in chunks {
                let metadata = serde_json::to_string(&chunk.to_vector_metadata())?;
                let embedding = serde_json::to_string(&chunk.embedding)?;
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    self.name,
                    chunk.document_id.to_string(),
                    chunk.chunk_index,
                    chunk.content,
                    metadata,
                    embedding,
                    now,
                ])?;
                rowids.push(tx.last_insert_rowid());
            }
        }

        tx.commit()?;
        drop(conn);

        for (chunk, rowid) in chunks.iter().zip(rowids) {
            self.index
                .insert_slice((chunk.embedding.as_slice(), rowid as usize));
        }
        self.indexed.fetch_add(chunks.len(), Ordering::SeqCst);

        Ok(chunks.len())
    }

    /// Approximate top-k cosine search, best match first
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<StoredRecord>> {
        if top_k == 0 || vector.is_empty() || self.indexed.load(Ordering::SeqCst) == 0 {
            return Ok(Vec::new());
        }

        if let Some(dims) = self.dimensions()? {
            if dims != vector.len() {
                return Err(Error::vector_db(format!(
                    "Query has {} dimensions, collection '{}' holds {}",
                    vector.len(),
                    self.name,
                    dims
                )));
            }
        }

        let neighbours = self
            .index
            .search(vector, top_k, self.params.ef_search.max(top_k));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, document_id, chunk_index, content, metadata
             FROM embeddings WHERE rowid = ?1",
        )?;

        let mut records = Vec::with_capacity(neighbours.len());
        for neighbour in neighbours {
            let (id, document_id, chunk_index, content, metadata) =
                stmt.query_row(params![neighbour.d_id as i64], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })?;

            records.push(StoredRecord {
                id: parse_uuid(&id)?,
                document_id: parse_uuid(&document_id)?,
                chunk_index,
                content,
                metadata: serde_json::from_str(&metadata)?,
                similarity: 1.0 - neighbour.distance,
            });
        }

        records.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(records)
    }

    /// Number of records in the collection
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE collection = ?1",
            params![self.name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Run database migrations
fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        "#,
    )
    .map_err(|e| Error::vector_db(format!("Failed to set pragmas: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            dimensions INTEGER,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS embeddings (
            id TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            document_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            content TEXT NOT NULL,
            metadata TEXT NOT NULL,
            embedding TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (collection) REFERENCES collections(name)
        );

        CREATE INDEX IF NOT EXISTS idx_embeddings_collection ON embeddings(collection);
        "#,
    )
    .map_err(|e| Error::vector_db(format!("Failed to run migrations: {}", e)))?;

    Ok(())
}

/// `(rowid, vector)` for every record in `collection`
fn load_vectors(conn: &Connection, collection: &str) -> Result<Vec<(i64, Vec<f32>)>> {
    let mut stmt =
        conn.prepare("SELECT rowid, embedding FROM embeddings WHERE collection = ?1")?;
    let rows = stmt.query_map(params![collection], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut vectors = Vec::new();
    for row in rows {
        let (rowid, embedding) = row?;
        vectors.push((rowid, serde_json::from_str(&embedding)?));
    }
    Ok(vectors)
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::vector_db(format!("Corrupt record id '{}': {}", value, e)))
}
