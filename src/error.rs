use crate::domain::audio::{AudioError, PlaybackError};
use crate::domain::cache::FetchError;
use crate::domain::tts::TtsServiceError;

/// Main application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("Network error: {0}")]
    Network(#[from] FetchError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Process exit code for this error (sysexits-style)
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BadRequest(_) => 64,
            Self::Audio(_) => 65,
            Self::ExternalService(_) | Self::Network(_) => 69,
            Self::Internal(_) => 70,
            Self::Playback(_) => 74,
            Self::Config(_) => 78,
        }
    }
}

impl From<TtsServiceError> for AppError {
    fn from(err: TtsServiceError) -> Self {
        match err {
            TtsServiceError::Invalid(msg) => AppError::BadRequest(msg),
            TtsServiceError::Dependency(msg) => AppError::ExternalService(msg),
            TtsServiceError::Audio(e) => AppError::Audio(e),
            TtsServiceError::Playback(e) => AppError::Playback(e),
            TtsServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
