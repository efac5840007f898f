//! Server configuration loading from file and environment variables.

use mimic_media::{is_placeholder_credential, SynthesisConfig, ToolConfig};
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level server configuration.
///
/// Built once at startup and shared read-only with every request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Language-model settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Speech-synthesis provider settings.
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Local media tool settings.
    #[serde(default)]
    pub tools: ToolConfig,

    /// Chat turn settings.
    #[serde(default)]
    pub turn: TurnConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "mimic_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Language-model client configuration.
#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

/// Chat turn configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnConfig {
    /// Root under which each turn gets its own scratch directory.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Directory holding the pre-recorded greeting and warning clips.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Fragments beyond this count are dropped from a model reply.
    #[serde(default = "default_max_fragments")]
    pub max_fragments: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_llm_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_temperature() -> f32 {
    0.6
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    40
}

fn default_max_output_tokens() -> u32 {
    1000
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("mimic")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("audios")
}

fn default_max_fragments() -> usize {
    3
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_llm_model(),
            base_url: default_llm_base_url(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            assets_dir: default_assets_dir(),
            max_fragments: default_max_fragments(),
        }
    }
}

impl LlmConfig {
    pub fn has_credential(&self) -> bool {
        !is_placeholder_credential(&self.api_key)
    }
}

impl Config {
    /// Whether both the language-model and the speech-synthesis credentials
    /// are present.
    pub fn credentials_ready(&self) -> bool {
        self.llm.has_credential() && self.synthesis.has_credential()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting holds a value the server cannot run with.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl Config {
    /// Checks limits that would otherwise fail every turn silently.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn.max_fragments == 0 {
            return Err(ConfigError::Invalid {
                field: "turn.max_fragments",
                reason: "must be at least 1",
            });
        }
        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "tools.timeout_secs",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `MIMIC_HOST`, `MIMIC_PORT` override `server.host`, `server.port`
/// - `MIMIC_LOG_LEVEL`, `MIMIC_LOG_JSON` override `logging.*`
/// - `GEMINI_API_KEY`, `GEMINI_MODEL` override `llm.api_key`, `llm.model`
/// - `ELEVEN_LABS_API_KEY`, `ELEVEN_LABS_VOICE_ID`, `ELEVEN_LABS_MODEL_ID`
///   override `synthesis.*`
/// - `MIMIC_FFMPEG_PATH`, `MIMIC_RHUBARB_PATH`, `MIMIC_TOOL_TIMEOUT_SECS`
///   override `tools.*`
/// - `MIMIC_WORK_DIR`, `MIMIC_ASSETS_DIR`, `MIMIC_MAX_FRAGMENTS` override `turn.*`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if the resulting limits are invalid.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Applies environment overrides using `lookup` to read variables.
///
/// Unparsable numeric values, and zero for the positive limits, are ignored
/// and the file/default value is kept.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("MIMIC_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("MIMIC_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = lookup("MIMIC_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("MIMIC_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    if let Some(key) = lookup("GEMINI_API_KEY") {
        config.llm.api_key = key;
    }
    if let Some(model) = lookup("GEMINI_MODEL") {
        config.llm.model = model;
    }

    if let Some(key) = lookup("ELEVEN_LABS_API_KEY") {
        config.synthesis.api_key = key;
    }
    if let Some(voice) = lookup("ELEVEN_LABS_VOICE_ID") {
        config.synthesis.voice_id = voice;
    }
    if let Some(model) = lookup("ELEVEN_LABS_MODEL_ID") {
        config.synthesis.model_id = model;
    }

    if let Some(path) = lookup("MIMIC_FFMPEG_PATH") {
        config.tools.ffmpeg_binary = path.into();
    }
    if let Some(path) = lookup("MIMIC_RHUBARB_PATH") {
        config.tools.rhubarb_binary = path.into();
    }
    if let Some(secs) = lookup("MIMIC_TOOL_TIMEOUT_SECS") {
        match positive(&secs) {
            Some(parsed) => config.tools.timeout_secs = parsed,
            None => tracing::warn!(value = %secs, "ignoring MIMIC_TOOL_TIMEOUT_SECS"),
        }
    }

    if let Some(dir) = lookup("MIMIC_WORK_DIR") {
        config.turn.work_dir = dir.into();
    }
    if let Some(dir) = lookup("MIMIC_ASSETS_DIR") {
        config.turn.assets_dir = dir.into();
    }
    if let Some(max) = lookup("MIMIC_MAX_FRAGMENTS") {
        match positive(&max) {
            Some(parsed) => config.turn.max_fragments = parsed,
            None => tracing::warn!(value = %max, "ignoring MIMIC_MAX_FRAGMENTS"),
        }
    }
}

fn positive<T: std::str::FromStr + Default + PartialEq>(value: &str) -> Option<T> {
    value
        .trim()
        .parse()
        .ok()
        .filter(|parsed: &T| *parsed != T::default())
}
