//! Shared types for the Mimic avatar service.
//!
//! This crate holds the wire and domain types exchanged between the media
//! pipeline, the turn orchestrator, and HTTP clients: reply fragments, the
//! enumerated facial expression and animation cues, and the request/response
//! envelopes of the chat endpoint.
//!
//! Other crates in the workspace depend on `mimic-types` for these
//! definitions and never on each other for them.

pub mod avatar;
pub mod message;

pub use avatar::{Animation, FacialExpression, UnknownCueError};
pub use message::{ChatRequest, ChatResponse, Fragment, MediaPayload, TurnOutcome};
