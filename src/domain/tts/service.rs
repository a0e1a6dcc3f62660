use super::dto::SpeechRequest;
use super::error::TtsServiceError;
use crate::domain::audio::{decode_audio, AudioBuffer, AudioNormalizer, Playback, PlaybackChain};
use crate::infrastructure::audio::AudioOutput;
use crate::infrastructure::repositories::TtsRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct TtsService {
    tts_repo: Arc<dyn TtsRepository>,
    output: Arc<dyn AudioOutput>,
    normalizer: AudioNormalizer,
    chain: PlaybackChain,
    normalize_by_default: bool,
    current: Mutex<Option<Arc<Playback>>>,
}

impl TtsService {
    pub fn new(
        tts_repo: Arc<dyn TtsRepository>,
        output: Arc<dyn AudioOutput>,
        normalizer: AudioNormalizer,
        chain: PlaybackChain,
        normalize_by_default: bool,
    ) -> Self {
        Self {
            tts_repo,
            output,
            normalizer,
            chain,
            normalize_by_default,
            current: Mutex::new(None),
        }
    }
}

#[async_trait]
pub trait TtsServiceApi: Send + Sync {
    /// Fetch the encoded audio for a request (cached or from the provider)
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, TtsServiceError>;

    /// Synthesize and decode, normalizing when requested, without playing.
    /// Callbacks can be registered on the returned playback before `play`.
    async fn prepare(&self, request: &SpeechRequest) -> Result<Playback, TtsServiceError>;

    /// Stop the active utterance, if any, then start this one
    async fn play(&self, playback: Playback) -> Result<Arc<Playback>, TtsServiceError>;

    /// `prepare` followed by `play`
    async fn speak(&self, request: &SpeechRequest) -> Result<Arc<Playback>, TtsServiceError>;

    /// Halt the active utterance and release its device
    async fn stop(&self);
}

#[async_trait]
impl TtsServiceApi for TtsService {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, TtsServiceError> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(TtsServiceError::Invalid("Text cannot be empty".to_string()));
        }

        tracing::info!(
            text_length = text.len(),
            voice = ?request.voice,
            "TTS synthesis request"
        );

        self.tts_repo
            .synthesize(request)
            .await
            .map_err(TtsServiceError::Dependency)
    }

    async fn prepare(&self, request: &SpeechRequest) -> Result<Playback, TtsServiceError> {
        let audio = self.synthesize(request).await?;
        let normalize = request.normalize.unwrap_or(self.normalize_by_default);

        let buffer = self.process(audio, normalize).await?;
        Ok(Playback::new(self.output.clone(), buffer))
    }

    async fn play(&self, playback: Playback) -> Result<Arc<Playback>, TtsServiceError> {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            previous.stop().await;
        }

        let playback = Arc::new(playback);
        playback.start()?;
        *current = Some(playback.clone());
        Ok(playback)
    }

    async fn speak(&self, request: &SpeechRequest) -> Result<Arc<Playback>, TtsServiceError> {
        let playback = self.prepare(request).await?;
        self.play(playback).await
    }

    async fn stop(&self) {
        let previous = self.current.lock().await.take();
        if let Some(previous) = previous {
            previous.stop().await;
        }
    }
}

impl TtsService {
    /// Decode and, if asked, normalize and run the playback chain.
    /// CPU-bound, so it runs on the blocking pool.
    async fn process(&self, audio: Vec<u8>, normalize: bool) -> Result<AudioBuffer, TtsServiceError> {
        let normalizer = self.normalizer;
        let chain = self.chain;

        tokio::task::spawn_blocking(move || -> Result<AudioBuffer, TtsServiceError> {
            let decoded = decode_audio(&audio)?;
            if !normalize {
                return Ok(decoded);
            }
            let normalized = normalizer.normalize(&decoded);
            Ok(chain.process(&normalized))
        })
        .await
        .map_err(|e| TtsServiceError::Other(anyhow::anyhow!("audio processing task failed: {}", e)))?
    }
}
