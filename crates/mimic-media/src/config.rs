use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SYNTHESIS_BASE_URL: &str = "https://api.elevenlabs.io";

fn default_voice_id() -> String {
    "cgSgspJ2msm6clMCkdW9".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_base_url() -> String {
    DEFAULT_SYNTHESIS_BASE_URL.to_string()
}

fn default_ffmpeg_binary() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_rhubarb_binary() -> PathBuf {
    PathBuf::from("bin/rhubarb")
}

fn default_tool_timeout_secs() -> u64 {
    120
}

/// Returns `true` when a credential is missing or still holds a template value.
pub fn is_placeholder_credential(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value == "-" {
        return true;
    }
    let lower = value.to_ascii_lowercase();
    lower == "changeme"
        || lower.starts_with("your-")
        || lower.starts_with("your_")
        || (value.starts_with('<') && value.ends_with('>'))
}

/// Speech-synthesis provider settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// The fixed voice every fragment is spoken with.
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: default_voice_id(),
            model_id: default_model_id(),
            base_url: default_base_url(),
        }
    }
}

impl fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("api_key", &"[REDACTED]")
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SynthesisConfig {
    /// Creates a new config with the given key and voice and default model
    /// and endpoint.
    pub fn new(api_key: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            voice_id: voice_id.into(),
            ..Self::default()
        }
    }

    /// Points the client at another endpoint, such as a local stand-in.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether the API key is set to something other than a placeholder.
    pub fn has_credential(&self) -> bool {
        !is_placeholder_credential(&self.api_key)
    }
}

/// Locations and limits of the local media tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Path to the `ffmpeg` binary used for MP3 to WAV transcoding.
    #[serde(default = "default_ffmpeg_binary")]
    pub ffmpeg_binary: PathBuf,
    /// Path to the Rhubarb Lip Sync binary.
    #[serde(default = "default_rhubarb_binary")]
    pub rhubarb_binary: PathBuf,
    /// Upper bound on a single tool invocation.
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: default_ffmpeg_binary(),
            rhubarb_binary: default_rhubarb_binary(),
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl ToolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
