#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use mimic_media::{CommandRunner, MediaError, SpeechSynthesizer, ToolCommand};
use mimic_server::config::Config;
use mimic_server::llm::{LanguageModel, LlmError};
use mimic_server::{app, AppState};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

pub const CANNED_ASSETS: [&str; 4] = ["intro_0", "intro_1", "api_0", "api_1"];

/// Language model that always returns the same reply.
pub struct ScriptedModel {
    reply: Result<String, String>,
    pub calls: AtomicUsize,
    pub last_instruction: Mutex<Option<String>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
            last_instruction: Mutex::new(None),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_instruction: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        _user_text: &str,
        system_instruction: &str,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_instruction.lock().unwrap() = Some(system_instruction.to_string());
        self.reply.clone().map_err(LlmError::Request)
    }
}

/// Synthesizer that writes `speech:<text>` as the audio, failing for chosen texts.
#[derive(Default)]
pub struct FakeSynthesizer {
    pub fail_texts: Vec<String>,
    pub voices_error: bool,
    pub spoken: Mutex<Vec<String>>,
}

pub fn speech_bytes(text: &str) -> Vec<u8> {
    format!("speech:{text}").into_bytes()
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, output: &Path) -> Result<(), MediaError> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail_texts.iter().any(|t| t == text) {
            return Err(MediaError::Synthesis("HTTP 429: quota exceeded".to_string()));
        }
        tokio::fs::write(output, speech_bytes(text)).await?;
        Ok(())
    }

    async fn list_voices(&self) -> Result<Value, MediaError> {
        if self.voices_error {
            return Err(MediaError::Synthesis("HTTP 401: invalid api key".to_string()));
        }
        Ok(json!({"voices": [{"voice_id": "voice-1", "name": "Jessica"}]}))
    }
}

/// Stands in for ffmpeg and rhubarb by writing the expected output files.
#[derive(Default)]
pub struct FakeTools {
    /// Artifact file name (e.g. `message_1.wav`) on which rhubarb fails.
    pub rhubarb_fails_on: Option<String>,
}

#[async_trait]
impl CommandRunner for FakeTools {
    async fn run(&self, command: &ToolCommand) -> Result<String, MediaError> {
        let args: Vec<PathBuf> = command.args().iter().map(PathBuf::from).collect();
        match command.label().as_str() {
            "ffmpeg" => {
                tokio::fs::write(args.last().unwrap(), b"RIFF").await?;
            }
            "rhubarb" => {
                let wav = &args[4];
                let name = wav.file_name().unwrap().to_string_lossy().into_owned();
                if self.rhubarb_fails_on.as_deref() == Some(name.as_str()) {
                    return Err(MediaError::ToolExecution {
                        program: "rhubarb".to_string(),
                        detail: "exit status: 1: unsupported sample rate".to_string(),
                    });
                }
                let doc = json!({
                    "metadata": {"soundFile": name},
                    "mouthCues": [{"start": 0.0, "end": 0.2, "value": "B"}]
                });
                tokio::fs::write(&args[3], doc.to_string()).await?;
            }
            other => panic!("unexpected tool {other}"),
        }
        Ok(String::new())
    }
}

/// Temporary directories backing a test app.
pub struct TestDirs {
    pub root: TempDir,
}

impl TestDirs {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let assets = root.path().join("audios");
        std::fs::create_dir_all(&assets).unwrap();
        for asset in CANNED_ASSETS {
            std::fs::write(assets.join(format!("{asset}.wav")), canned_audio(asset)).unwrap();
            std::fs::write(
                assets.join(format!("{asset}.json")),
                json!({"metadata": {"soundFile": format!("{asset}.wav")}, "mouthCues": []})
                    .to_string(),
            )
            .unwrap();
        }
        Self { root }
    }

    pub fn assets(&self) -> PathBuf {
        self.root.path().join("audios")
    }

    pub fn work(&self) -> PathBuf {
        self.root.path().join("work")
    }
}

pub fn canned_audio(asset: &str) -> Vec<u8> {
    format!("recorded:{asset}").into_bytes()
}

pub fn test_config(dirs: &TestDirs) -> Config {
    let mut config = Config::default();
    config.llm.api_key = "AIza-test".to_string();
    config.synthesis.api_key = "sk_test".to_string();
    config.turn.assets_dir = dirs.assets();
    config.turn.work_dir = dirs.work();
    config
}

pub fn build_app(
    config: &Config,
    llm: Arc<ScriptedModel>,
    synthesizer: Arc<FakeSynthesizer>,
    tools: FakeTools,
) -> Router {
    app(AppState::new(config, llm, synthesizer, Arc::new(tools)))
}

pub async fn post_chat(app: Router, body: Option<Value>) -> (axum::http::StatusCode, Value) {
    let builder = Request::builder().uri("/chat").method("POST");
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn post_chat_raw(
    app: Router,
    content_type: Option<&str>,
    body: &str,
) -> (axum::http::StatusCode, Value) {
    let mut builder = Request::builder().uri("/chat").method("POST");
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let response = app
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
