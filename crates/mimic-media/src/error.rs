use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    /// An external tool could not be spawned, exited non-zero, or timed out.
    #[error("{program} failed: {detail}")]
    ToolExecution { program: String, detail: String },

    #[error("speech synthesis error: {0}")]
    Synthesis(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid lip-sync document: {0}")]
    Lipsync(#[from] serde_json::Error),
}
