//! HTTP gateway for the RAG service

pub mod routes;
pub mod state;

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::engine::RetrievalEngine;
use crate::error::{ErrorKind, Result};
use state::AppState;

/// RAG HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a server backed by Gemini providers.
    ///
    /// Fails immediately when `GOOGLE_API_KEY` is not configured.
    pub fn new(config: RagConfig) -> Result<Self> {
        let engine = RetrievalEngine::from_config(&config)?;
        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    /// Create a server around an existing engine
    pub fn with_engine(config: RagConfig, engine: Arc<RetrievalEngine>) -> Self {
        let state = AppState::new(config.clone(), engine);
        Self { config, state }
    }

    /// Shared state handed to handlers
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .merge(routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Ingest the startup knowledge base, then serve until shutdown
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| crate::error::Error::Config(format!("Invalid address: {}", e)))?;

        ingest_knowledge_base(&self.state).await;

        let router = self.build_router();

        tracing::info!("Starting RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::error::Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| crate::error::Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Ingest the configured knowledge base file if it exists.
///
/// Never fails: a missing file or an ingestion error is logged and startup continues.
pub async fn ingest_knowledge_base(state: &AppState) {
    let path = &state.config().server.knowledge_base_path;

    if !path.exists() {
        tracing::warn!("{} not found. Skipping initial ingestion.", path.display());
        return;
    }

    tracing::info!("Ingesting {}...", path.display());
    match state.engine().ingest(path).await {
        Ok(result) if result.error_kind == ErrorKind::QuotaExhausted => {
            tracing::warn!(
                "Skipped ingesting {}: provider quota exhausted",
                path.display()
            );
        }
        Ok(result) => {
            tracing::info!(
                "Ingested {} successfully ({} chunks)",
                path.display(),
                result.chunks_created
            );
        }
        Err(e) => {
            tracing::error!("Error ingesting {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::EmbeddingProvider;
    use crate::testing::{working_providers, EchoLlm, FailingEmbedder, FailingLlm, HashEmbedder};
    use crate::types::response::{
        CHAT_QUOTA_APOLOGY, LIVENESS_MESSAGE, REASONING_PLACEHOLDER, REASONING_QUOTA,
        UPLOAD_QUOTA_APOLOGY,
    };
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::path::Path;
    use tower::ServiceExt;

    const BOUNDARY: &str = "gemini-rag-test-boundary";

    fn test_config(dir: &Path) -> RagConfig {
        let mut config = RagConfig::default();
        config.vector_db.persist_dir = dir.join("chroma_db");
        config.server.upload_dir = dir.join("uploads");
        config.server.knowledge_base_path = dir.join("knowledge_base.md");
        config
    }

    fn server_with(config: RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> RagServer {
        let engine = RetrievalEngine::new(&config, embedder, Arc::new(EchoLlm::default()));
        RagServer::with_engine(config, Arc::new(engine))
    }

    fn working_server(dir: &Path) -> RagServer {
        let (embedder, _) = working_providers();
        server_with(test_config(dir), embedder)
    }

    fn upload_request(filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            c = content
        );
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn chat_request(query: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "query": query }).to_string()))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_liveness() {
        let dir = tempfile::tempdir().unwrap();
        let router = working_server(dir.path()).build_router();

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], LIVENESS_MESSAGE);
    }

    #[tokio::test]
    async fn test_upload_then_chat() {
        let dir = tempfile::tempdir().unwrap();
        let router = working_server(dir.path()).build_router();

        let (status, body) = send(
            &router,
            upload_request("facts.txt", "The capital of France is Paris."),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Successfully processed facts.txt");
        assert!(body.get("status").is_none());

        let (status, body) = send(&router, chat_request("What is the capital of France?")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["answer"].as_str().unwrap().contains("Paris"));
        assert_eq!(body["reasoning"], REASONING_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_upload_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let server = working_server(dir.path());
        let upload_dir = server.state().config().server.upload_dir.clone();
        let router = server.build_router();

        let (status, _) = send(&router, upload_request("notes.md", "# Notes\n\nSome notes.")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&router, upload_request("bundle.zip", "PK")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let leftover = std::fs::read_dir(&upload_dir).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let router = working_server(dir.path()).build_router();

        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("No file uploaded"));
    }

    #[tokio::test]
    async fn test_quota_exhaustion_is_soft() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_with(
            test_config(dir.path()),
            Arc::new(FailingEmbedder::new("429 RESOURCE_EXHAUSTED")),
        );
        let router = server.build_router();

        let (status, body) = send(&router, upload_request("facts.txt", "Some facts.")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], UPLOAD_QUOTA_APOLOGY);

        let (status, body) = send(&router, chat_request("Anything?")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], CHAT_QUOTA_APOLOGY);
        assert_eq!(body["reasoning"], REASONING_QUOTA);
    }

    #[tokio::test]
    async fn test_chat_with_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let router = working_server(dir.path()).build_router();

        let (status, body) = send(&router, chat_request("Is anything indexed?")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Empty Response");
    }

    #[tokio::test]
    async fn test_startup_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let server = working_server(dir.path());

        // Missing knowledge base is skipped
        ingest_knowledge_base(server.state()).await;
        assert_eq!(server.state().engine().record_count().await.unwrap(), 0);

        std::fs::write(
            dir.path().join("knowledge_base.md"),
            "# Facts\n\nMount Everest is the highest mountain.",
        )
        .unwrap();
        ingest_knowledge_base(server.state()).await;
        assert_eq!(server.state().engine().record_count().await.unwrap(), 1);

        let router = server.build_router();
        let (_, body) = send(&router, chat_request("What is the highest mountain?")).await;
        assert!(body["answer"].as_str().unwrap().contains("Everest"));
    }

    #[tokio::test]
    async fn test_chat_provider_error_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let engine = RetrievalEngine::new(
            &config,
            Arc::new(HashEmbedder::new(64)),
            Arc::new(FailingLlm::new("API key not valid")),
        );
        let router = RagServer::with_engine(config, Arc::new(engine)).build_router();

        let (status, _) = send(&router, upload_request("facts.txt", "The sky is blue.")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, chat_request("What colour is the sky?")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "llm_error");
        assert!(body["detail"].as_str().unwrap().contains("API key not valid"));
    }

    #[test]
    fn test_new_fails_without_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let result = RagServer::new(test_config(dir.path()));
        assert!(matches!(result, Err(crate::error::Error::Config(_))));
    }
}
