//! Storage module for persistent data storage
//!
//! Provides the SQLite-persisted, HNSW-searched vector collection.

mod collection;

pub use collection::{HnswParams, StoredRecord, VectorCollection, DATABASE_FILE};
