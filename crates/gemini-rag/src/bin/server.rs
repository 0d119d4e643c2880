//! RAG Server binary
//!
//! Run with: GOOGLE_API_KEY=... cargo run -p gemini-rag --bin gemini-rag-server

use gemini_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::from_env()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.gemini.embed_model);
    tracing::info!("  - LLM model: {}", config.gemini.generate_model);
    tracing::info!("  - Persist dir: {}", config.vector_db.persist_dir.display());
    tracing::info!("  - Collection: {}", config.vector_db.collection);
    tracing::info!("  - Chunk size: {}", config.chunking.chunk_size);

    // Fails here when GOOGLE_API_KEY is missing
    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("\nEndpoints:");
    println!("  GET  /       - Liveness");
    println!("  POST /upload - Upload a document (multipart field \"file\")");
    println!("  POST /chat   - Ask a question ({{\"query\": \"...\"}})");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
