use crate::domain::tts::SpeechRequest;
use async_trait::async_trait;

/// Repository for TTS synthesis operations.
/// Abstracts the underlying TTS provider (OpenAI-compatible API, local engine, etc.)
///
/// Implementations are responsible for:
/// - Handling provider-specific text length limitations
/// - Splitting text into batches if needed
/// - Merging audio chunks into a single audio stream
/// - Provider-specific voice selection
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Synthesize text to speech
    ///
    /// Returns merged, still-encoded audio data ready for decoding (MP3 by default)
    ///
    /// # Errors
    /// Returns error if synthesis fails, the provider is unreachable, or it answers with a non-2xx status
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, String>;
}
