use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("segment source failed: {0}")]
    Source(String),

    #[error("invalid segment: {0}")]
    InvalidSegment(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MergeError>;
