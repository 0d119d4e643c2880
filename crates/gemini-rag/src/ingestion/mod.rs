//! Document ingestion: text extraction and chunking

mod chunker;
mod parser;

pub use chunker::TextChunker;
pub use parser::{FileParser, ParsedDocument};
