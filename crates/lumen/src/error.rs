use lumen_m3u::DecryptError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LumenError {
    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error("Playlist decryption failed: {0}")]
    Decrypt(#[from] DecryptError),

    #[error("Failed to resolve title: {0}")]
    ResolveFailure(String),

    #[error("Episode {index} out of range, title has {len} episodes")]
    EpisodeOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type LumenResult<T> = Result<T, LumenError>;
