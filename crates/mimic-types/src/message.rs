//! Chat turn payloads.

use crate::avatar::{Animation, FacialExpression};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speech audio and its mouth-shape timing for one fragment.
///
/// Both halves come from the same pipeline run, so they travel together: a
/// fragment carries either the whole payload or none of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded audio bytes.
    pub audio: String,
    /// Viseme timing document, passed through verbatim.
    pub lipsync: Value,
}

/// One reply unit spoken by the avatar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Position in the reply. Used for artifact naming; not sent on the wire.
    #[serde(skip)]
    pub index: usize,
    pub text: String,
    #[serde(rename = "facialExpression")]
    pub facial_expression: FacialExpression,
    pub animation: Animation,
    /// Absent when media generation failed for this fragment.
    #[serde(flatten)]
    pub media: Option<MediaPayload>,
}

impl Fragment {
    /// Creates a text-only fragment.
    pub fn new(
        index: usize,
        text: impl Into<String>,
        facial_expression: FacialExpression,
        animation: Animation,
    ) -> Self {
        Self {
            index,
            text: text.into(),
            facial_expression,
            animation,
            media: None,
        }
    }

    pub fn with_media(mut self, media: MediaPayload) -> Self {
        self.media = Some(media);
        self
    }

    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }
}

/// Which branch produced a turn's fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnOutcome {
    /// No user message; pre-recorded greeting.
    Greeting,
    /// Missing collaborator credentials; pre-recorded warning.
    Misconfigured,
    /// Model-driven reply.
    Normal,
}

impl TurnOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "GREETING",
            Self::Misconfigured => "MISCONFIGURED",
            Self::Normal => "NORMAL",
        }
    }
}

/// Request body for `POST /chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Response body for `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub messages: Vec<Fragment>,
}
