//! Per-fragment media pipeline.
//!
//! Each fragment goes through synthesize → transcode → extract visemes →
//! encode. Steps hand each other typed artifact handles ([`SpeechFile`],
//! [`WaveFile`], [`VisemeFile`]), so a step cannot run before the one whose
//! output it consumes.

use crate::config::ToolConfig;
use crate::error::MediaError;
use crate::tool::{CommandRunner, ToolCommand};
use crate::tts::SpeechSynthesizer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mimic_types::MediaPayload;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use thiserror::Error;

/// Encodes audio bytes for transport.
pub fn encode_audio(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes transport-encoded audio back into bytes.
pub fn decode_audio(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded)
}

/// Scratch directory owned by a single chat turn.
///
/// Artifacts are named `message_{index}.{ext}` inside it. The directory and
/// everything in it is removed when the workspace is dropped.
#[derive(Debug)]
pub struct TurnWorkspace {
    dir: TempDir,
}

impl TurnWorkspace {
    /// Creates a fresh, uniquely named workspace under `root`, creating
    /// `root` first if needed.
    ///
    /// The directory calls are blocking, so they run on the blocking pool.
    pub async fn create_in(root: &Path) -> std::io::Result<Self> {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || -> std::io::Result<Self> {
            std::fs::create_dir_all(&root)?;
            let dir = tempfile::Builder::new().prefix("turn-").tempdir_in(&root)?;
            Ok(Self { dir })
        })
        .await
        .map_err(std::io::Error::other)?
    }

    /// Directory holding this turn's artifacts.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn artifact(&self, index: usize, extension: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("message_{}.{}", index, extension))
    }
}

/// Synthesized speech (MP3).
#[derive(Debug, Clone)]
pub struct SpeechFile {
    index: usize,
    path: PathBuf,
}

/// Transcoded speech (WAV), the input format of the viseme extractor.
#[derive(Debug, Clone)]
pub struct WaveFile {
    index: usize,
    path: PathBuf,
}

/// Viseme timing document (JSON).
#[derive(Debug, Clone)]
pub struct VisemeFile {
    index: usize,
    path: PathBuf,
}

/// Pipeline step names, used in failures and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Synthesize,
    Transcode,
    ExtractVisemes,
    Encode,
}

impl PipelineStage {
    /// Stable snake_case name for logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Synthesize => "synthesize",
            Self::Transcode => "transcode",
            Self::ExtractVisemes => "extract_visemes",
            Self::Encode => "encode",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fragment whose media could not be produced.
#[derive(Debug, Error)]
#[error("fragment {index} failed at {stage}: {source}")]
pub struct PipelineFailure {
    pub index: usize,
    pub stage: PipelineStage,
    #[source]
    pub source: MediaError,
}

impl PipelineFailure {
    fn at(index: usize, stage: PipelineStage) -> impl FnOnce(MediaError) -> Self {
        move |source| Self {
            index,
            stage,
            source,
        }
    }
}

/// Drives the media steps for one fragment at a time.
#[derive(Clone)]
pub struct MediaPipeline {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    runner: Arc<dyn CommandRunner>,
    tools: ToolConfig,
}

impl fmt::Debug for MediaPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPipeline")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl MediaPipeline {
    /// Creates a new pipeline over the given synthesizer and tool runner.
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        runner: Arc<dyn CommandRunner>,
        tools: ToolConfig,
    ) -> Self {
        Self {
            synthesizer,
            runner,
            tools,
        }
    }

    /// Produces audio and lip-sync for fragment `index`.
    ///
    /// Stops at the first failing step; nothing is retried.
    pub async fn run(
        &self,
        workspace: &TurnWorkspace,
        index: usize,
        text: &str,
    ) -> Result<MediaPayload, PipelineFailure> {
        let started = Instant::now();

        let speech = self
            .synthesize(workspace, index, text)
            .await
            .map_err(PipelineFailure::at(index, PipelineStage::Synthesize))?;

        let wave = self
            .transcode(&speech)
            .await
            .map_err(PipelineFailure::at(index, PipelineStage::Transcode))?;

        let visemes = self
            .extract_visemes(&wave)
            .await
            .map_err(PipelineFailure::at(index, PipelineStage::ExtractVisemes))?;

        let payload = Self::encode(&speech, &visemes)
            .await
            .map_err(PipelineFailure::at(index, PipelineStage::Encode))?;

        tracing::info!(
            index,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fragment media ready"
        );
        Ok(payload)
    }

    /// Synthesizes `text` into the fragment's MP3 artifact.
    pub async fn synthesize(
        &self,
        workspace: &TurnWorkspace,
        index: usize,
        text: &str,
    ) -> Result<SpeechFile, MediaError> {
        let path = workspace.artifact(index, "mp3");
        self.synthesizer.synthesize(text, &path).await?;
        Ok(SpeechFile { index, path })
    }

    /// Converts the MP3 into a WAV next to it with `ffmpeg`.
    pub async fn transcode(&self, speech: &SpeechFile) -> Result<WaveFile, MediaError> {
        let started = Instant::now();
        let path = speech.path.with_extension("wav");
        let command = ToolCommand::new(&self.tools.ffmpeg_binary)
            .arg("-y")
            .arg("-i")
            .arg(&speech.path)
            .arg(&path);
        self.runner.run(&command).await?;
        tracing::debug!(
            index = speech.index,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "transcode done"
        );
        Ok(WaveFile {
            index: speech.index,
            path,
        })
    }

    /// Runs Rhubarb (phonetic recognizer) on the WAV and writes the
    /// viseme track as JSON.
    pub async fn extract_visemes(&self, wave: &WaveFile) -> Result<VisemeFile, MediaError> {
        let started = Instant::now();
        let path = wave.path.with_extension("json");
        let command = ToolCommand::new(&self.tools.rhubarb_binary)
            .arg("-f")
            .arg("json")
            .arg("-o")
            .arg(&path)
            .arg(&wave.path)
            .arg("-r")
            .arg("phonetic");
        self.runner.run(&command).await?;
        tracing::debug!(
            index = wave.index,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "viseme extraction done"
        );
        Ok(VisemeFile {
            index: wave.index,
            path,
        })
    }

    /// Reads the speech and viseme artifacts back into a transport payload.
    pub async fn encode(
        speech: &SpeechFile,
        visemes: &VisemeFile,
    ) -> Result<MediaPayload, MediaError> {
        let audio = tokio::fs::read(&speech.path).await?;
        let document = tokio::fs::read_to_string(&visemes.path).await?;
        let lipsync: Value = serde_json::from_str(&document)?;
        tracing::debug!(
            index = visemes.index,
            audio_bytes = audio.len(),
            "fragment artifacts encoded"
        );
        Ok(MediaPayload {
            audio: encode_audio(&audio),
            lipsync,
        })
    }
}
