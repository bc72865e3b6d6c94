//! Chat completion calls against an OpenAI-compatible upstream
//!
//! The upstream is anything that serves `POST {url}/chat/completions` with the
//! OpenAI request and response shapes (Groq by default).
use crate::client::{HttpClient, set_host_header};
use crate::errors::GenerateError;
use crate::models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use axum::body::Body;
use axum::http::{Method, Request, header};
use bon::Builder;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, instrument};
use url::Url;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.groq.com/openai/v1/";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const COMPLETIONS_PATH: &str = "chat/completions";

/// Where and how chat completions are requested.
#[derive(Clone, Builder)]
pub struct Upstream {
    /// Base URL; `chat/completions` is joined onto it.
    pub url: Url,
    /// Sent as `Authorization: Bearer {api_key}` when present.
    pub api_key: Option<String>,
    #[builder(into, default = DEFAULT_MODEL.to_string())]
    pub model: String,
    #[builder(default = Duration::from_secs(60))]
    pub timeout: Duration,
}

impl std::fmt::Debug for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upstream")
            .field("url", &self.url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Upstream {
    /// `url` is treated as a directory whether or not it ends in `/`.
    fn completions_url(&self) -> Result<Url, GenerateError> {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(COMPLETIONS_PATH)
            .map_err(|e| GenerateError::Upstream(format!("invalid upstream url: {}", e)))
    }

    fn build_request(&self, messages: Vec<ChatMessage>) -> Result<Request<Body>, GenerateError> {
        let url = self.completions_url()?;
        let body = serde_json::to_vec(&ChatCompletionRequest {
            model: self.model.clone(),
            messages,
        })
        .map_err(|e| GenerateError::Upstream(format!("failed to encode request: {}", e)))?;

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        } else {
            debug!("No API key configured for upstream {}", self.url);
        }

        let mut req = builder
            .body(Body::from(body))
            .map_err(|e| GenerateError::Upstream(format!("failed to build request: {}", e)))?;
        set_host_header(&mut req);
        Ok(req)
    }

    /// Sends one completion request and returns the first choice's content.
    #[instrument(skip(self, client, messages), fields(model = %self.model))]
    pub async fn complete<T: HttpClient + Sync>(
        &self,
        client: &T,
        messages: Vec<ChatMessage>,
    ) -> Result<String, GenerateError> {
        let req = self.build_request(messages)?;

        let response = timeout(self.timeout, client.request(req))
            .await
            .map_err(|_| {
                error!("Upstream request timed out after {:?}", self.timeout);
                GenerateError::Upstream("request timed out".to_string())
            })?
            .map_err(|e| {
                error!("Error sending request to upstream {}: {}", self.url, e);
                GenerateError::Upstream(e.to_string())
            })?;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| GenerateError::Upstream(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            error!("Upstream returned {}: {}", status, body);
            return Err(GenerateError::UpstreamStatus { status, body });
        }

        let parsed: ChatCompletionResponse = serde_json::from_slice(&bytes)
            .map_err(|e| GenerateError::Upstream(format!("malformed completion: {}", e)))?;

        match parsed.first_content() {
            Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
            _ => Err(GenerateError::EmptyCompletion),
        }
    }
}
