use crate::domain::audio::{AudioError, PlaybackError};

#[derive(Debug, thiserror::Error)]
pub enum TtsServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
