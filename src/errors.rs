//! Error type for the `/generate` endpoint
//!
//! Every variant renders as the `{"error": "..."}` envelope the preview
//! trigger understands, with a status code that says whose fault it was.
use crate::models::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

#[derive(Debug)]
pub enum GenerateError {
    /// The request body was not a `{"json", "prompt"}` object
    BadRequest(String),
    /// The `json` field does not parse
    InvalidJson(serde_json::Error),
    /// The upstream could not be reached, timed out, or sent an unreadable body
    Upstream(String),
    /// The upstream answered with a non-success status
    UpstreamStatus { status: StatusCode, body: String },
    /// The upstream answered without any content
    EmptyCompletion,
    /// The model kept producing template or server-side code
    InvalidOutput { pattern: &'static str },
}

impl GenerateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GenerateError::BadRequest(_) | GenerateError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            GenerateError::Upstream(_)
            | GenerateError::UpstreamStatus { .. }
            | GenerateError::EmptyCompletion
            | GenerateError::InvalidOutput { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            GenerateError::InvalidJson(e) => write!(f, "Invalid JSON: {}", e),
            GenerateError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            GenerateError::UpstreamStatus { status, body } => {
                write!(f, "Upstream returned {}: {}", status, body)
            }
            GenerateError::EmptyCompletion => write!(f, "Model returned no content"),
            GenerateError::InvalidOutput { pattern } => write!(
                f,
                "AI could not generate valid HTML (found {:?}). Please try again.",
                pattern
            ),
        }
    }
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerateError::InvalidJson(e) => Some(e),
            _ => None,
        }
    }
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
