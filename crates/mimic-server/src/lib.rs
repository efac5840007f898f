//! Mimic server library logic.
//!
//! Wires configuration, collaborator clients and the turn orchestrator into
//! an axum router exposing `GET /`, `GET /voices` and `POST /chat`.

pub mod api;
pub mod canned;
pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod response;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use canned::CannedResponses;
use config::Config;
use llm::{GeminiClient, LanguageModel, LlmError};
use mimic_media::{
    CommandRunner, ElevenLabsSynthesizer, MediaError, MediaPipeline, ProcessRunner,
    SpeechSynthesizer,
};
use orchestrator::{TurnOrchestrator, TurnSettings};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Maximum request body size (64 KiB). Chat requests carry a single message.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Turn orchestrator.
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Speech synthesizer, also used for the voice catalogue.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

/// Errors that can occur while building the application state.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("language model client: {0}")]
    Llm(#[from] LlmError),

    #[error("speech synthesis client: {0}")]
    Media(#[from] MediaError),
}

impl AppState {
    /// Assembles state from explicit collaborators.
    pub fn new(
        config: &Config,
        llm: Arc<dyn LanguageModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let pipeline = MediaPipeline::new(synthesizer.clone(), runner, config.tools.clone());
        let settings = TurnSettings {
            work_dir: config.turn.work_dir.clone(),
            max_fragments: config.turn.max_fragments,
            credentials_ready: config.credentials_ready(),
        };
        let orchestrator = TurnOrchestrator::new(
            llm,
            pipeline,
            CannedResponses::new(&config.turn.assets_dir),
            settings,
        );
        Self {
            orchestrator: Arc::new(orchestrator),
            synthesizer,
        }
    }

    /// Assembles state with the Gemini, ElevenLabs and child-process clients.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let llm = Arc::new(GeminiClient::new(&config.llm)?);
        let synthesizer = Arc::new(ElevenLabsSynthesizer::new(config.synthesis.clone())?);
        let runner = Arc::new(ProcessRunner::new(config.tools.timeout()));
        Ok(Self::new(config, llm, synthesizer, runner))
    }
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::root_handler))
        .route("/voices", get(api::voices_handler))
        .route("/chat", post(api::chat_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
