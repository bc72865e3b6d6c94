//! Outbound HTTP for dashgen
//!
//! Two callers share one seam: the `/generate` handler reaching the completion
//! API, and the preview trigger reaching `/generate`. Both only need "send this
//! request, give me the response", so that is all [`HttpClient`] offers.
use async_trait::async_trait;
use axum::extract::Request;
use axum::http::header::HOST;
use axum::response::{IntoResponse, Response};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::time::Duration;
use tracing::debug;

pub type HyperClient = Client<HttpsConnector<HttpConnector>, axum::body::Body>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait HttpClient: std::fmt::Debug {
    async fn request(&self, req: Request) -> Result<Response, BoxError>;
}

#[async_trait]
impl HttpClient for HyperClient {
    async fn request(&self, req: Request) -> Result<Response, BoxError> {
        let response = Client::request(self, req).await?;
        Ok(response.into_response())
    }
}

const IDLE_TIMEOUT_VAR: &str = "DASHGEN_POOL_IDLE_TIMEOUT_SECS";
const MAX_IDLE_VAR: &str = "DASHGEN_POOL_MAX_IDLE_PER_HOST";

/// Connection reuse settings for [`HyperClient`].
///
/// Dashboard generation is one slow request at a time per user, so the pool
/// stays small by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub idle_timeout: Duration,
    pub max_idle_per_host: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(90),
            max_idle_per_host: 16,
        }
    }
}

impl PoolSettings {
    /// Reads overrides through `lookup`; unset or unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            idle_timeout: lookup(IDLE_TIMEOUT_VAR)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            max_idle_per_host: lookup(MAX_IDLE_VAR)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_idle_per_host),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn build_client(self) -> HyperClient {
        debug!(settings = ?self, "Building HTTP client");
        Client::builder(TokioExecutor::new())
            .pool_idle_timeout(self.idle_timeout)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .pool_timer(TokioTimer::new())
            .build(HttpsConnector::new())
    }
}

/// A client configured from `DASHGEN_POOL_*` environment variables.
pub fn create_hyper_client() -> HyperClient {
    PoolSettings::from_env().build_client()
}

/// Sets the `host` header from the request's absolute URI.
pub(crate) fn set_host_header(req: &mut Request) {
    let Some(host) = req.uri().host() else {
        return;
    };
    let host_value = match req.uri().port_u16() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    if let Ok(value) = host_value.parse() {
        req.headers_mut().insert(HOST, value);
    }
}
