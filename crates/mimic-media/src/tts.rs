use crate::config::SynthesisConfig;
use crate::error::MediaError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion from
/// oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Timeout for a single synthesis HTTP request.
const TTS_TIMEOUT: Duration = Duration::from_secs(60);

const XI_API_KEY_HEADER: &str = "xi-api-key";

/// Speech-synthesis collaborator.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speaks `text` with the configured voice and writes the MP3 to `output`.
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), MediaError>;

    /// Returns the provider's voice catalogue as-is.
    async fn list_voices(&self) -> Result<Value, MediaError>;
}

#[derive(Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// ElevenLabs text-to-speech client.
#[derive(Debug, Clone)]
pub struct ElevenLabsSynthesizer {
    config: SynthesisConfig,
    client: reqwest::Client,
}

impl ElevenLabsSynthesizer {
    /// Creates a new client for the configured voice.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Config` if the HTTP client cannot be built.
    pub fn new(config: SynthesisConfig) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(TTS_TIMEOUT)
            .build()
            .map_err(|e| MediaError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), MediaError> {
        if text.trim().is_empty() {
            return Err(MediaError::Synthesis("text is empty".to_string()));
        }
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(MediaError::Synthesis(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let url = self.endpoint(&format!("/v1/text-to-speech/{}", self.config.voice_id));
        let response = self
            .client
            .post(&url)
            .header(XI_API_KEY_HEADER, &self.config.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .query(&[("output_format", "mp3_44100_128")])
            .json(&TextToSpeechRequest {
                text,
                model_id: &self.config.model_id,
            })
            .send()
            .await
            .map_err(|e| MediaError::Synthesis(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Synthesis(format!("HTTP {}: {}", status, body)));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| MediaError::Synthesis(format!("failed to read audio body: {}", e)))?;
        if audio.is_empty() {
            return Err(MediaError::Synthesis("provider returned no audio".to_string()));
        }

        tokio::fs::write(output, &audio).await?;
        tracing::debug!(
            path = %output.display(),
            bytes = audio.len(),
            "wrote synthesized speech"
        );
        Ok(())
    }

    async fn list_voices(&self) -> Result<Value, MediaError> {
        let response = self
            .client
            .get(self.endpoint("/v1/voices"))
            .header(XI_API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(|e| MediaError::Synthesis(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Synthesis(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| MediaError::Synthesis(format!("invalid voice list: {}", e)))
    }
}
