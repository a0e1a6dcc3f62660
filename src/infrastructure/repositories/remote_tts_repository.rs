use super::tts_repository::TtsRepository;
use crate::domain::cache::{CacheOptions, CachedFetch, FetchRequest};
use crate::domain::tts::SpeechRequest;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};

/// OpenAI-compatible speech endpoints accept at most 4096 characters per request
const MAX_BATCH_SIZE: usize = 4096;

/// Sentence-ending punctuation followed by whitespace
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?]+\s+)").expect("sentence pattern is a valid regex"));

#[derive(Serialize)]
struct SpeechBody<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
    response_format: &'a str,
}

/// Remote synthesis over an OpenAI-compatible `/audio/speech` API.
///
/// Every batch goes through `CachedFetch`, so repeating an utterance is served
/// from the response cache.
pub struct RemoteTtsRepository {
    fetcher: Arc<CachedFetch>,
    base_url: String,
    api_key: Option<String>,
    model: String,
    default_voice: String,
    cache_options: CacheOptions,
}

impl RemoteTtsRepository {
    pub fn new(
        fetcher: Arc<CachedFetch>,
        base_url: String,
        api_key: Option<String>,
        model: String,
        default_voice: String,
    ) -> Self {
        Self {
            fetcher,
            base_url,
            api_key,
            model,
            default_voice,
            cache_options: CacheOptions::default(),
        }
    }

    pub fn with_cache_options(mut self, cache_options: CacheOptions) -> Self {
        self.cache_options = cache_options;
        self
    }

    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.base_url.trim_end_matches('/'))
    }

    /// Call the speech endpoint for a single text batch
    async fn call_api(&self, text: &str, voice: &str, speed: Option<f32>) -> Result<Vec<u8>, String> {
        let body = serde_json::to_vec(&SpeechBody {
            model: &self.model,
            input: text,
            voice,
            speed,
            response_format: "mp3",
        })
        .map_err(|e| format!("Failed to encode speech request: {}", e))?;

        let mut request = FetchRequest::post(self.speech_url(), body)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "audio/mpeg")
            .with_cache(self.cache_options);
        if let Some(api_key) = &self.api_key {
            request = request.with_header("Authorization", format!("Bearer {}", api_key));
        }

        tracing::info!(
            model = %self.model,
            voice = voice,
            text_length = text.len(),
            "Calling remote TTS API"
        );

        let response = self.fetcher.fetch(&request).await.map_err(|e| {
            tracing::error!(error = %e, model = %self.model, voice = voice, "Remote TTS request failed");
            format!("TTS API request failed: {}", e)
        })?;

        if !response.is_success() {
            let detail = String::from_utf8_lossy(&response.body);
            tracing::error!(
                status = response.status,
                model = %self.model,
                voice = voice,
                "Remote TTS API returned an error status"
            );
            return Err(format!("TTS API error {}: {}", response.status, detail));
        }

        tracing::debug!(audio_size = response.body.len(), "Remote TTS audio received");
        Ok(response.body)
    }
}

/// Split text into batches of at most `max_len` bytes, preferring to cut
/// after sentence-ending punctuation and falling back to character boundaries.
fn split_into_batches(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut batches = Vec::new();
    let mut current = String::new();

    for sentence in sentences(text) {
        if !current.is_empty() && current.len() + sentence.len() > max_len {
            batches.push(current.trim().to_string());
            current.clear();
        }
        if sentence.len() > max_len {
            let mut chunk = String::new();
            for c in sentence.chars() {
                if chunk.len() + c.len_utf8() > max_len {
                    batches.push(std::mem::take(&mut chunk));
                }
                chunk.push(c);
            }
            current = chunk;
        } else {
            current.push_str(sentence);
        }
    }

    if !current.trim().is_empty() {
        batches.push(current.trim().to_string());
    }
    batches
}

/// Sentences including their terminating punctuation and trailing whitespace
fn sentences(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut last_end = 0;

    for mat in SENTENCE_END.find_iter(text) {
        parts.push(&text[last_end..mat.end()]);
        last_end = mat.end();
    }
    if last_end < text.len() {
        parts.push(&text[last_end..]);
    }
    parts
}

#[async_trait]
impl TtsRepository for RemoteTtsRepository {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, String> {
        let start_time = std::time::Instant::now();
        let voice = request.voice.as_deref().unwrap_or(&self.default_voice);

        let batches = split_into_batches(&request.text, MAX_BATCH_SIZE);
        tracing::info!(
            batch_count = batches.len(),
            text_length = request.text.len(),
            voice = voice,
            "Starting remote TTS synthesis"
        );

        let mut merged_audio = Vec::new();
        for (index, batch) in batches.iter().enumerate() {
            let audio = self.call_api(batch, voice, request.speed).await?;
            merged_audio.extend(audio);
            tracing::debug!(
                batch_index = index,
                total_audio_size = merged_audio.len(),
                "Batch synthesized and merged"
            );
        }

        tracing::info!(
            provider = "remote",
            model = %self.model,
            voice = voice,
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = request.text.len(),
            batch_count = batches.len(),
            audio_size_bytes = merged_audio.len(),
            "TTS synthesis completed"
        );

        Ok(merged_audio)
    }
}
