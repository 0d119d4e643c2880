//! Gemini API providers for embeddings and answer generation
//!
//! Both providers share one `GeminiClient`, which authenticates with an API
//! key and turns rate-limit responses into `Error::QuotaExhausted`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// `batchEmbedContents` accepts at most 100 requests per call
const MAX_BATCH_EMBED: usize = 100;

/// Status string Google APIs use for rate limits
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Thin REST client for the Generative Language API
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client. Fails if no API key is configured.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                return Err(Error::Config(
                    "GOOGLE_API_KEY not found in environment variables".to_string(),
                ))
            }
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint URL for `model:method`
    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, model_path(model), method)
    }

    /// POST a JSON body and decode the JSON reply.
    ///
    /// `wrap` builds the provider-specific error for non-quota failures.
    async fn post<Req, Resp>(
        &self,
        model: &str,
        method: &str,
        body: &Req,
        wrap: fn(String) -> Error,
    ) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(model, method))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| wrap(format!("Gemini {} request failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_response(method, status, &body, wrap));
        }

        response
            .json()
            .await
            .map_err(|e| wrap(format!("Failed to parse Gemini {} response: {}", method, e)))
    }
}

/// Error payload returned by Google APIs
#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Turn a non-success reply into an error, preferring the structured quota kind
fn map_error_response(method: &str, status: StatusCode, body: &str, wrap: fn(String) -> Error) -> Error {
    let detail = serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| b.error);

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || detail.as_ref().is_some_and(|d| d.status == RESOURCE_EXHAUSTED);

    let message = match &detail {
        Some(d) if !d.message.is_empty() => format!("{} {}: {}", status.as_u16(), d.status, d.message),
        _ => format!("{}: {}", status, body),
    };

    if rate_limited {
        Error::QuotaExhausted(format!("Gemini {} rate limited ({})", method, message))
    } else {
        wrap(format!("Gemini {} failed ({})", method, message))
    }
}

/// Accept model names with or without the `models/` prefix
fn model_path(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Gemini embedding provider
pub struct GeminiEmbedder {
    client: Arc<GeminiClient>,
    model: String,
}

impl GeminiEmbedder {
    /// Create from a shared client
    pub fn new(client: Arc<GeminiClient>, config: &GeminiConfig) -> Self {
        Self {
            client,
            model: model_path(&config.embed_model),
        }
    }

    fn request(&self, text: &str) -> EmbedRequest {
        EmbedRequest {
            model: self.model.clone(),
            content: Content::text(None, text),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response: EmbedResponse = self
            .client
            .post(&self.model, "embedContent", &self.request(text), Error::Embedding)
            .await?;

        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_EMBED) {
            let request = BatchEmbedRequest {
                requests: batch.iter().map(|t| self.request(t)).collect(),
            };

            let response: BatchEmbedResponse = self
                .client
                .post(&self.model, "batchEmbedContents", &request, Error::Embedding)
                .await?;

            if response.embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Gemini returned {} embeddings for {} texts",
                    response.embeddings.len(),
                    batch.len()
                )));
            }

            all_embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(all_embeddings)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Gemini LLM provider
pub struct GeminiLlm {
    client: Arc<GeminiClient>,
    model: String,
    temperature: f32,
}

impl GeminiLlm {
    /// Create from a shared client
    pub fn new(client: Arc<GeminiClient>, config: &GeminiConfig) -> Self {
        Self {
            client,
            model: model_path(&config.generate_model),
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::text(Some("user"), prompt)],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response: GenerateResponse = self
            .client
            .post(&self.model, "generateContent", &request, Error::Llm)
            .await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::llm("No text in Gemini response"));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Build both Gemini providers around one shared client
pub fn gemini_providers(config: &GeminiConfig) -> Result<(GeminiEmbedder, GeminiLlm)> {
    let client = Arc::new(GeminiClient::new(config)?);
    Ok((
        GeminiEmbedder::new(Arc::clone(&client), config),
        GeminiLlm::new(client, config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_missing_key_fails_fast() {
        let config = GeminiConfig::default();
        assert!(matches!(GeminiClient::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_endpoint() {
        let config = GeminiConfig {
            api_key: Some("k".to_string()),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("text-embedding-004", "embedContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent"
        );
        assert_eq!(
            client.endpoint("models/gemini-2.5-flash", "generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_429_maps_to_quota() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded for metric","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = map_error_response("embedContent", StatusCode::TOO_MANY_REQUESTS, body, Error::Embedding);
        assert!(matches!(err, Error::QuotaExhausted(_)));
        assert_eq!(err.kind(), ErrorKind::QuotaExhausted);
    }

    #[test]
    fn test_resource_exhausted_status_without_429() {
        let body = r#"{"error":{"code":400,"message":"limit","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = map_error_response("generateContent", StatusCode::BAD_REQUEST, body, Error::Llm);
        assert!(matches!(err, Error::QuotaExhausted(_)));
    }

    #[test]
    fn test_other_failures_keep_provider_variant() {
        let body = r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#;
        let err = map_error_response("generateContent", StatusCode::FORBIDDEN, body, Error::Llm);
        assert!(matches!(err, Error::Llm(_)));
        assert_eq!(err.kind(), ErrorKind::None);

        let err = map_error_response("embedContent", StatusCode::BAD_GATEWAY, "<html>", Error::Embedding);
        assert!(matches!(err, Error::Embedding(_)));
    }
}
