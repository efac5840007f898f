//! HTTP handlers for the Mimic server.

use crate::error::TurnError;
use crate::response;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Extension, Json},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use mimic_media::MediaError;
use mimic_types::{ChatRequest, ChatResponse};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The chat turn failed as a whole.
    #[error("failed to process chat: {0}")]
    Chat(#[from] TurnError),

    #[error("failed to fetch voices: {0}")]
    Voices(#[source] MediaError),

    /// A JSON request body that does not parse as a chat request.
    #[error("invalid request body: {0}")]
    InvalidBody(#[source] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Chat(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": "Failed to process chat",
                    "details": e.to_string(),
                }),
            ),
            ApiError::Voices(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": format!("Failed to fetch voices: {}", e),
                }),
            ),
            ApiError::InvalidBody(e) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "Invalid request body",
                    "details": e.to_string(),
                }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Handler for `GET /`.
pub async fn root_handler() -> &'static str {
    "Hello World!"
}

/// Handler for `GET /voices`.
pub async fn voices_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let voices = state.synthesizer.list_voices().await.map_err(|e| {
        tracing::error!(error = %e, "voice listing failed");
        ApiError::Voices(e)
    })?;
    Ok(Json(voices))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Reads a chat request the way a lenient JSON body parser would.
///
/// An empty body, a `null` body, or a body that is not declared as JSON all
/// read as a request without a message.
pub fn parse_chat_request(headers: &HeaderMap, body: &[u8]) -> Result<ChatRequest, ApiError> {
    if !is_json(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ChatRequest::default());
    }
    let request: Option<ChatRequest> =
        serde_json::from_slice(body).map_err(ApiError::InvalidBody)?;
    Ok(request.unwrap_or_default())
}

/// Handler for `POST /chat`.
pub async fn chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = parse_chat_request(&headers, &body).map_err(|e| {
        tracing::warn!(error = %e, "rejected chat request body");
        e
    })?;

    let turn = state
        .orchestrator
        .run_turn(request.message.as_deref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "chat turn failed");
            ApiError::Chat(e)
        })?;

    let degraded = turn.fragments.iter().filter(|f| !f.has_media()).count();
    tracing::info!(
        outcome = turn.outcome.as_str(),
        fragments = turn.fragments.len(),
        degraded,
        "chat turn complete"
    );
    Ok(Json(response::assemble(turn)))
}
