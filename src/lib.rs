//! dashgen - turn JSON data and a design prompt into an HTML dashboard
//!
//! The server side exposes `POST /generate`, which asks an OpenAI-compatible
//! model for a static dashboard and returns it as `{"html": ...}`. The client
//! side is the [`preview::PreviewTrigger`], which drives one request against
//! that endpoint on behalf of a [`preview::PreviewPage`].

use axum::Router;
use axum::routing::post;
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, instrument};

pub mod client;
pub mod completion;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod preview;
pub mod prompt;
pub mod sanitize;

use client::{HttpClient, HyperClient};
use completion::Upstream;
use handlers::{generate, not_found};

/// Shared state for the generate server
#[derive(Clone, Debug)]
pub struct AppState<T: HttpClient> {
    pub http_client: T,
    pub upstream: Arc<Upstream>,
    /// Wrap generated markup in the styled container document.
    pub wrap_output: bool,
}

impl AppState<HyperClient> {
    /// Create a new AppState with the default Hyper client
    pub fn new(upstream: Upstream) -> Self {
        Self::with_client(upstream, client::create_hyper_client())
    }
}

impl<T: HttpClient> AppState<T> {
    /// Create a new AppState with a custom HTTP client (useful for testing)
    pub fn with_client(upstream: Upstream, http_client: T) -> Self {
        Self {
            http_client,
            upstream: Arc::new(upstream),
            wrap_output: false,
        }
    }

    pub fn wrap_output(mut self, wrap: bool) -> Self {
        self.wrap_output = wrap;
        self
    }
}

/// Build the main router
/// - `POST /generate` - generates a dashboard
/// - anything else - `404 {"error": "Not found"}`
#[instrument(skip(state))]
pub fn build_router<T: HttpClient + Clone + Send + Sync + 'static>(state: AppState<T>) -> Router {
    info!("Building router");
    Router::new()
        .route(preview::GENERATE_PATH, post(generate))
        .fallback(not_found)
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}

#[cfg(test)]
pub mod test_utils {
    use crate::client::{BoxError, HttpClient};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type Respond = Arc<dyn Fn() -> Result<axum::response::Response, String> + Send + Sync>;

    /// Records every request and answers from a queue of canned responses.
    /// The last response repeats once the queue is down to one.
    #[derive(Clone)]
    pub struct MockHttpClient {
        pub requests: Arc<Mutex<Vec<MockRequest>>>,
        responses: Arc<Mutex<VecDeque<Respond>>>,
    }

    #[derive(Debug, Clone)]
    pub struct MockRequest {
        pub method: String,
        pub uri: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl MockRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        }
    }

    fn respond_with(status: StatusCode, body: &str) -> Respond {
        let body = body.to_string();
        Arc::new(move || {
            Ok(axum::response::Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body.clone()))
                .unwrap())
        })
    }

    impl MockHttpClient {
        pub fn new(status: StatusCode, body: &str) -> Self {
            Self::sequence(vec![(status, body)])
        }

        /// Answers with each `(status, body)` in turn.
        pub fn sequence(responses: Vec<(StatusCode, &str)>) -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                responses: Arc::new(Mutex::new(
                    responses
                        .into_iter()
                        .map(|(status, body)| respond_with(status, body))
                        .collect(),
                )),
            }
        }

        /// Every request fails before a response arrives.
        pub fn failing(message: &str) -> Self {
            let message = message.to_string();
            let respond: Respond = Arc::new(move || Err(message.clone()));
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                responses: Arc::new(Mutex::new(VecDeque::from([respond]))),
            }
        }

        pub fn get_requests(&self) -> Vec<MockRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn next_response(&self) -> Respond {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                Arc::clone(responses.front().expect("mock has no responses"))
            }
        }
    }

    impl std::fmt::Debug for MockHttpClient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockHttpClient")
                .field("requests", &self.requests)
                .field("responses", &"<closures>")
                .finish()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn request(
            &self,
            req: axum::extract::Request,
        ) -> Result<axum::response::Response, BoxError> {
            let method = req.method().to_string();
            let uri = req.uri().to_string();
            let headers = req
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();

            let body = axum::body::to_bytes(req.into_body(), usize::MAX)
                .await
                .map_err(|e| Box::new(e) as BoxError)?
                .to_vec();

            self.requests.lock().unwrap().push(MockRequest {
                method,
                uri,
                headers,
                body,
            });

            (self.next_response())().map_err(BoxError::from)
        }
    }
}
