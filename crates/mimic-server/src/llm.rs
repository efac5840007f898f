//! Language-model collaborator.

use crate::config::LlmConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Timeout for a single completion request.
const LLM_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model request failed: {0}")]
    Request(String),

    #[error("language model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("language model returned no text")]
    EmptyResponse,

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Black-box text completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Completes `user_text` under `system_instruction` and returns the raw reply text.
    async fn complete(&self, user_text: &str, system_instruction: &str)
        -> Result<String, LlmError>;
}

/// Sampling parameters sent with every completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl From<&LlmConfig> for GenerationConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentOut>,
}

#[derive(Deserialize)]
struct GeminiContentOut {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    generation: GenerationConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            api_key: config.api_key.trim().to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            generation: GenerationConfig::from(config),
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn complete(
        &self,
        user_text: &str,
        system_instruction: &str,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system_instruction.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: user_text.to_string(),
                }],
            }],
            generation_config: self.generation,
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;
        tracing::debug!(status = status.as_u16(), model = %self.model, "gemini responded");

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&body_text)
            .map_err(|e| LlmError::Request(format!("malformed response envelope: {}", e)))?;

        let text: String = parsed
            .candidates
            .as_ref()
            .and_then(|cands| cands.first())
            .and_then(|cand| cand.content.as_ref())
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}
