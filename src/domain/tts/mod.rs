pub mod dto;
pub mod error;
pub mod service;

pub use dto::SpeechRequest;
pub use error::TtsServiceError;
pub use service::{TtsService, TtsServiceApi};
