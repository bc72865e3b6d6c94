//! Axum handlers for the dashboard server
use crate::client::HttpClient;
use crate::errors::GenerateError;
use crate::models::{ChatMessage, ErrorResponse, GenerateRequest, GenerateResponse};
use crate::{AppState, prompt, sanitize};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info, instrument, warn};

/// `POST /generate`: turns `{json, prompt}` into `{html}`.
#[instrument(skip(state, payload))]
pub async fn generate<T: HttpClient + Clone + Send + Sync + 'static>(
    State(state): State<AppState<T>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, GenerateError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected request body: {}", rejection);
        GenerateError::BadRequest(rejection.body_text())
    })?;

    info!(
        json_len = request.json.len(),
        prompt_len = request.prompt.len(),
        "Received generate request"
    );

    let html = render_dashboard(&state, &request).await?;
    Ok(Json(GenerateResponse { html }))
}

/// Runs the full generation pipeline for one request.
///
/// The data is parsed and enriched, the model is asked for a dashboard, and its
/// output is cleaned up. Output containing template code gets exactly one
/// corrective round trip before the request fails.
pub async fn render_dashboard<T: HttpClient + Sync>(
    state: &AppState<T>,
    request: &GenerateRequest,
) -> Result<String, GenerateError> {
    let mut data: serde_json::Value =
        serde_json::from_str(&request.json).map_err(GenerateError::InvalidJson)?;
    prompt::enrich(&mut data);

    let first = state
        .upstream
        .complete(
            &state.http_client,
            vec![
                ChatMessage::system(prompt::SYSTEM_PROMPT),
                ChatMessage::user(prompt::build_user_prompt(&data, &request.prompt)),
            ],
        )
        .await?;
    let mut html = sanitize::strip_code_fences(&first);
    debug!("AI output:\n{}", html);

    if let Some(pattern) = sanitize::find_template_artifact(&html) {
        warn!(pattern, "Model output contains template code, requesting a correction");
        let corrected = state
            .upstream
            .complete(
                &state.http_client,
                vec![
                    ChatMessage::system(prompt::SYSTEM_PROMPT),
                    ChatMessage::user(prompt::build_correction_prompt(&data)),
                ],
            )
            .await?;
        html = sanitize::strip_code_fences(&corrected);
        debug!("Corrected AI output:\n{}", html);

        if let Some(pattern) = sanitize::find_template_artifact(&html) {
            warn!(pattern, "Corrected output still contains template code");
            return Err(GenerateError::InvalidOutput { pattern });
        }
    }

    if state.wrap_output {
        html = sanitize::wrap_dashboard(&html);
    }
    Ok(html)
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
}
