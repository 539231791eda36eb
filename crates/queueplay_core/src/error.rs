use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Video not found: {0}")]
    VideoNotFound(uuid::Uuid),

    #[error("No active video")]
    NoActiveVideo,

    #[error("Invalid chapter: {0}")]
    InvalidChapter(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
