//! Routes for the RAG gateway

pub mod chat;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;
use crate::types::HealthResponse;

/// Build the gateway routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route(
            "/upload",
            post(upload::upload_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/chat", post(chat::chat))
}

/// GET / - liveness
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}
