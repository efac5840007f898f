//! Chat turn orchestration.
//!
//! A turn takes one of three branches, checked in order:
//!
//! - no message: the pre-recorded greeting,
//! - missing credentials: the pre-recorded configuration warning,
//! - otherwise: a language-model reply whose fragments are voiced one by one
//!   through the media pipeline.
//!
//! Media failures degrade a single fragment to text only. Only a failed or
//! unparsable model reply (or a missing canned asset) fails the turn.

use crate::canned::CannedResponses;
use crate::error::TurnError;
use crate::llm::LanguageModel;
use crate::response::{self, FragmentDraft};
use mimic_media::{MediaPipeline, TurnWorkspace};
use mimic_types::{Animation, FacialExpression, Fragment, TurnOutcome};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of one chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub outcome: TurnOutcome,
    pub fragments: Vec<Fragment>,
}

/// Per-process turn settings.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub work_dir: PathBuf,
    pub max_fragments: usize,
    /// Both collaborator credentials are configured.
    pub credentials_ready: bool,
}

/// Builds the system instruction: persona plus the output contract.
pub fn system_instruction(max_fragments: usize) -> String {
    let expressions: Vec<&str> = FacialExpression::ALL.iter().map(|e| e.as_str()).collect();
    let animations: Vec<&str> = Animation::ALL.iter().map(|a| a.as_str()).collect();
    format!(
        "You are a warm, playful virtual companion who talks with the user through an animated avatar.\n\
         You will always reply with a JSON array of messages, with a maximum of {max} messages.\n\
         Each message has a text, facialExpression, and animation property.\n\
         The different facial expressions are: {expressions}.\n\
         The different animations are: {animations}.\n\
         Reply with the JSON only, without any other text.",
        max = max_fragments,
        expressions = expressions.join(", "),
        animations = animations.join(", "),
    )
}

/// A fragment as the model wrote it, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFragment {
    pub text: String,
    #[serde(rename = "facialExpression", default)]
    pub facial_expression: Option<String>,
    #[serde(default)]
    pub animation: Option<String>,
}

/// Removes a surrounding Markdown code fence (with optional language tag).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parses a model reply into raw fragments.
///
/// Accepts a bare array, an object with a `messages` array, or a single
/// fragment object, optionally wrapped in a code fence.
pub fn parse_model_reply(raw: &str) -> Result<Vec<RawFragment>, TurnError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(TurnError::ChatProcessing(
            "language model returned an empty reply".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(body).map_err(|e| {
        TurnError::ChatProcessing(format!("language model reply is not valid JSON: {}", e))
    })?;

    let value = match value {
        Value::Object(mut map) => match map.remove("messages") {
            Some(messages) => messages,
            None => Value::Object(map),
        },
        other => other,
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        other => {
            return Err(TurnError::ChatProcessing(format!(
                "expected a list of messages, got {}",
                other
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).map_err(|e| {
                TurnError::ChatProcessing(format!("message {} has an unexpected shape: {}", i, e))
            })
        })
        .collect()
}

/// Drops blank fragments, bounds the count, and validates cues.
///
/// Unknown expressions and animations fall back to `default` and `Idle`.
/// Indices are assigned after filtering, so they stay contiguous from 0.
pub fn repair(raw: Vec<RawFragment>, max_fragments: usize) -> Vec<FragmentDraft> {
    let total = raw.len();
    let mut kept: Vec<RawFragment> = raw
        .into_iter()
        .filter(|f| !f.text.trim().is_empty())
        .collect();
    if kept.len() < total {
        tracing::warn!(dropped = total - kept.len(), "dropped blank fragments from model reply");
    }
    if kept.len() > max_fragments {
        tracing::warn!(
            received = kept.len(),
            max = max_fragments,
            "model reply exceeds fragment limit, truncating"
        );
        kept.truncate(max_fragments);
    }

    kept.into_iter()
        .enumerate()
        .map(|(index, raw)| FragmentDraft {
            index,
            facial_expression: cue_or_default(index, raw.facial_expression.as_deref()),
            animation: cue_or_default(index, raw.animation.as_deref()),
            text: raw.text,
        })
        .collect()
}

fn cue_or_default<T>(index: usize, value: Option<&str>) -> T
where
    T: std::str::FromStr<Err = mimic_types::UnknownCueError> + Default,
{
    match value.map(str::parse::<T>) {
        Some(Ok(cue)) => cue,
        Some(Err(e)) => {
            tracing::warn!(index, error = %e, "falling back to default cue");
            T::default()
        }
        None => T::default(),
    }
}

/// Runs chat turns against the configured collaborators.
pub struct TurnOrchestrator {
    llm: Arc<dyn LanguageModel>,
    pipeline: MediaPipeline,
    canned: CannedResponses,
    settings: TurnSettings,
    instruction: String,
}

impl TurnOrchestrator {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        pipeline: MediaPipeline,
        canned: CannedResponses,
        settings: TurnSettings,
    ) -> Self {
        let instruction = system_instruction(settings.max_fragments);
        Self {
            llm,
            pipeline,
            canned,
            settings,
            instruction,
        }
    }

    /// Picks the branch for a message.
    pub fn classify(&self, message: Option<&str>) -> TurnOutcome {
        match message {
            None => TurnOutcome::Greeting,
            Some(m) if m.trim().is_empty() => TurnOutcome::Greeting,
            Some(_) if !self.settings.credentials_ready => TurnOutcome::Misconfigured,
            Some(_) => TurnOutcome::Normal,
        }
    }

    pub async fn run_turn(&self, message: Option<&str>) -> Result<Turn, TurnError> {
        let outcome = self.classify(message);
        tracing::info!(outcome = outcome.as_str(), "starting chat turn");

        match (outcome, message) {
            (TurnOutcome::Normal, Some(message)) => self.run_model_turn(message).await,
            _ => Ok(Turn {
                outcome,
                fragments: self.canned.select(outcome).await?,
            }),
        }
    }

    async fn run_model_turn(&self, message: &str) -> Result<Turn, TurnError> {
        let reply = self
            .llm
            .complete(message, &self.instruction)
            .await
            .map_err(|e| TurnError::ChatProcessing(e.to_string()))?;

        let drafts = repair(parse_model_reply(&reply)?, self.settings.max_fragments);
        if drafts.is_empty() {
            return Ok(Turn {
                outcome: TurnOutcome::Normal,
                fragments: Vec::new(),
            });
        }

        let workspace = TurnWorkspace::create_in(&self.settings.work_dir)
            .await
            .map_err(TurnError::Workspace)?;

        // Fragments are voiced one at a time, in index order.
        let mut fragments = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let media = self.pipeline.run(&workspace, draft.index, &draft.text).await;
            if let Err(failure) = &media {
                tracing::warn!(
                    index = failure.index,
                    stage = %failure.stage,
                    error = %failure.source,
                    "media generation failed, sending fragment as text only"
                );
            }
            fragments.push(response::project(draft, media));
        }

        Ok(Turn {
            outcome: TurnOutcome::Normal,
            fragments,
        })
    }
}
