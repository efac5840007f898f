//! Response assembly.

use crate::orchestrator::Turn;
use mimic_media::PipelineFailure;
use mimic_types::{Animation, ChatResponse, FacialExpression, Fragment, MediaPayload};

/// A validated model fragment that has not been through the media pipeline yet.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDraft {
    pub index: usize,
    pub text: String,
    pub facial_expression: FacialExpression,
    pub animation: Animation,
}

/// Combines a draft with its pipeline result.
///
/// A failed pipeline yields a text-only fragment: text and cues are kept,
/// audio and lip-sync are both left out.
pub fn project(draft: FragmentDraft, media: Result<MediaPayload, PipelineFailure>) -> Fragment {
    let fragment = Fragment::new(
        draft.index,
        draft.text,
        draft.facial_expression,
        draft.animation,
    );
    match media {
        Ok(payload) => fragment.with_media(payload),
        Err(_) => fragment,
    }
}

/// Wraps a finished turn into the `{ messages: [...] }` envelope, order untouched.
pub fn assemble(turn: Turn) -> ChatResponse {
    ChatResponse {
        messages: turn.fragments,
    }
}
