use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole chat turn.
///
/// Per-fragment media failures never surface here; they degrade the
/// fragment instead.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The language model failed or its reply could not be parsed.
    #[error("chat processing failed: {0}")]
    ChatProcessing(String),

    #[error("asset not found: {}", .0.display())]
    AssetNotFound(PathBuf),

    #[error("unreadable asset {}: {detail}", .path.display())]
    InvalidAsset { path: PathBuf, detail: String },

    #[error("failed to prepare turn workspace: {0}")]
    Workspace(#[source] std::io::Error),
}
