//! Preview trigger: the client side of `/generate`
//!
//! A trigger reads the data and the design prompt from a [`PreviewPage`], posts
//! them to the server, and either renders the returned HTML into the page's
//! preview or hands the server's error message to the page as a notification.
//!
//! Server-reported errors are an expected outcome and come back as
//! [`PreviewOutcome::Rejected`]. Everything else that goes wrong (the request
//! never completes, the body is not a reply) is a [`PreviewError`]; in that case
//! the page is neither notified nor updated.
use crate::client::{BoxError, HttpClient, set_host_header};
use crate::models::{GenerateReply, GenerateRequest};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use std::fmt;
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const GENERATE_PATH: &str = "/generate";

/// What the trigger needs from the page hosting it.
pub trait PreviewPage {
    /// Current text of the JSON input.
    fn read_json(&self) -> String;
    /// Current text of the prompt input.
    fn read_prompt(&self) -> String;
    /// Replaces the preview with a fresh document built from `html`.
    fn set_preview(&mut self, html: String);
    /// Shows `message` to the user without blocking.
    fn notify(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// The preview now shows the returned HTML.
    Rendered,
    /// The server reported this error; the preview was left as it was.
    Rejected(String),
}

#[derive(Debug)]
pub enum PreviewError {
    Request(String),
    Transport(BoxError),
    Body(String),
    /// A non-success status whose body is not a reply.
    Status { status: StatusCode, body: String },
    Decode(serde_json::Error),
    /// The reply carried neither an error nor any HTML.
    MissingHtml,
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewError::Request(msg) => write!(f, "failed to build request: {}", msg),
            PreviewError::Transport(e) => write!(f, "request to server failed: {}", e),
            PreviewError::Body(msg) => write!(f, "failed to read response body: {}", msg),
            PreviewError::Status { status, body } => {
                write!(f, "server returned {}: {}", status, body)
            }
            PreviewError::Decode(e) => write!(f, "response is not a valid reply: {}", e),
            PreviewError::MissingHtml => write!(f, "reply contains no html"),
        }
    }
}

impl std::error::Error for PreviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PreviewError::Transport(e) => Some(e.as_ref()),
            PreviewError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreviewTrigger<T: HttpClient> {
    client: T,
    server: Url,
}

impl<T: HttpClient + Sync> PreviewTrigger<T> {
    /// `server` is the origin serving `/generate`; any path on it is ignored.
    pub fn new(client: T, server: Url) -> Self {
        Self { client, server }
    }

    fn build_request(&self, payload: &GenerateRequest) -> Result<Request<Body>, PreviewError> {
        let url = self
            .server
            .join(GENERATE_PATH)
            .map_err(|e| PreviewError::Request(e.to_string()))?;
        let body = serde_json::to_vec(payload).map_err(|e| PreviewError::Request(e.to_string()))?;

        let mut req = Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|e| PreviewError::Request(e.to_string()))?;
        set_host_header(&mut req);
        Ok(req)
    }

    /// Runs one request/response cycle against the server.
    ///
    /// Exactly one request is sent per call. No timeout is applied and the
    /// request is never retried.
    #[instrument(skip_all, fields(server = %self.server))]
    pub async fn generate_dashboard<P: PreviewPage + Send>(
        &self,
        page: &mut P,
    ) -> Result<PreviewOutcome, PreviewError> {
        debug!("Button clicked!");

        let payload = GenerateRequest {
            json: page.read_json(),
            prompt: page.read_prompt(),
        };
        let req = self.build_request(&payload)?;

        let response = self
            .client
            .request(req)
            .await
            .map_err(PreviewError::Transport)?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| PreviewError::Body(e.to_string()))?;

        let reply: GenerateReply = match serde_json::from_slice(&bytes) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(PreviewError::Status {
                    status,
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
            Err(e) => return Err(PreviewError::Decode(e)),
        };

        if let Some(error) = reply.reported_error() {
            warn!(%status, "Server reported an error: {}", error);
            page.notify(&error);
            return Ok(PreviewOutcome::Rejected(error));
        }

        let html = reply.html.ok_or(PreviewError::MissingHtml)?;
        info!(html_len = html.len(), "Rendering preview");
        page.set_preview(html);
        Ok(PreviewOutcome::Rendered)
    }
}

/// A page whose inputs are fixed up front. The preview and every notification
/// are kept for the caller to inspect.
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    json: String,
    prompt: String,
    preview: Option<String>,
    notifications: Vec<String>,
}

impl StaticPage {
    pub fn new(json: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            json: json.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Starts with an existing preview, as a page that was rendered before would.
    pub fn with_preview(mut self, html: impl Into<String>) -> Self {
        self.preview = Some(html.into());
        self
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }
}

impl PreviewPage for StaticPage {
    fn read_json(&self) -> String {
        self.json.clone()
    }

    fn read_prompt(&self) -> String {
        self.prompt.clone()
    }

    fn set_preview(&mut self, html: String) {
        self.preview = Some(html);
    }

    fn notify(&mut self, message: &str) {
        self.notifications.push(message.to_string());
    }
}
