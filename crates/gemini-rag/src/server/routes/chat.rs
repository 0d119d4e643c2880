//! Question answering endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse};

/// POST /chat - answer a question from the knowledge base
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    tracing::info!("Chat query: {}", request.query);

    let result = state.engine().answer(&request.query).await?;

    Ok(Json(ChatResponse::from(result)))
}
