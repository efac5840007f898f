//! Media generation for avatar replies.
//!
//! Turns the text of one reply fragment into speech audio and a viseme
//! (mouth-shape) timing document. The work is split across three external
//! collaborators chained through on-disk artifacts:
//!
//! 1. a speech synthesizer (ElevenLabs over HTTP) writes an MP3,
//! 2. `ffmpeg` transcodes it to WAV,
//! 3. Rhubarb Lip Sync reads the WAV and writes a JSON viseme track.
//!
//! [`MediaPipeline`] drives those steps for one fragment inside a
//! per-turn [`TurnWorkspace`]; every step takes a handle to the artifact the
//! previous step produced, so the order cannot be rearranged.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod tool;
pub mod tts;

pub use config::{is_placeholder_credential, SynthesisConfig, ToolConfig};
pub use error::MediaError;
pub use pipeline::{
    decode_audio, encode_audio, MediaPipeline, PipelineFailure, PipelineStage, SpeechFile,
    TurnWorkspace, VisemeFile, WaveFile,
};
pub use tool::{CommandRunner, ProcessRunner, ToolCommand};
pub use tts::{ElevenLabsSynthesizer, SpeechSynthesizer};
