use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tts_relay::domain::audio::{AudioNormalizer, PlaybackChain};
use tts_relay::domain::cache::{CacheKeyBuilder, CachedFetch};
use tts_relay::domain::tts::{SpeechRequest, TtsService, TtsServiceApi};
use tts_relay::error::{AppError, AppResult};
use tts_relay::infrastructure::audio::{AudioOutput, WavFileOutput};
use tts_relay::infrastructure::config::{AudioOutputKind, CacheBackend, Config, LogFormat};
use tts_relay::infrastructure::http::ReqwestTransport;
use tts_relay::infrastructure::repositories::{CacheStore, MemoryCacheStore, RemoteTtsRepository, SqlCacheStore};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!(error = %e, "tts-relay failed");
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run() -> AppResult<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("usage: tts-relay <text to speak>".to_string()));
    }

    tracing::info!(
        api_url = %config.tts_api_url,
        model = %config.tts_model,
        voice = %config.tts_voice,
        cache_backend = ?config.cache_backend,
        normalize = config.normalize_audio,
        "Starting tts-relay"
    );

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Response cache store (opened lazily on first use)
    let store: Arc<dyn CacheStore> = match config.cache_backend {
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new(config.cache_max_capacity)),
        CacheBackend::Sqlite => Arc::new(SqlCacheStore::new(config.cache_database_url.clone())),
    };

    // 2. Cached fetch over the HTTP transport
    let transport = Arc::new(ReqwestTransport::new(config.http_timeout)?);
    let key_builder = if config.cache_hash_keys {
        CacheKeyBuilder::hashed()
    } else {
        CacheKeyBuilder::canonical()
    };
    let fetcher = Arc::new(
        CachedFetch::new(transport, store)
            .with_key_builder(key_builder)
            .with_default_max_age(config.cache_default_max_age),
    );

    // 3. Voice provider
    let tts_repo = Arc::new(RemoteTtsRepository::new(
        fetcher,
        config.tts_api_url.clone(),
        config.tts_api_key.clone(),
        config.tts_model.clone(),
        config.tts_voice.clone(),
    ));

    // 4. Audio pipeline and output
    let normalizer = AudioNormalizer::new(config.normalization)?;
    let chain = PlaybackChain::new(config.chain)?;
    let output = create_output(&config.audio_output)?;

    let tts_service = TtsService::new(tts_repo, output, normalizer, chain, config.normalize_audio);

    let playback = tts_service.prepare(&SpeechRequest::new(text)).await?;
    playback.set_on_start(|| tracing::info!("Utterance started"));
    playback.set_on_end(|| tracing::info!("Utterance finished"));
    let playback = tts_service.play(playback).await?;

    tokio::select! {
        result = playback.wait() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping playback");
            tts_service.stop().await;
        }
    }

    Ok(())
}

fn create_output(kind: &AudioOutputKind) -> AppResult<Arc<dyn AudioOutput>> {
    match kind {
        AudioOutputKind::WavFile(path) => Ok(Arc::new(WavFileOutput::new(path.clone()))),
        #[cfg(feature = "device")]
        AudioOutputKind::Device => Ok(Arc::new(tts_relay::infrastructure::audio::DeviceOutput::new())),
        #[cfg(not(feature = "device"))]
        AudioOutputKind::Device => Err(AppError::Config(
            "AUDIO_OUTPUT=device requires building with the 'device' feature".to_string(),
        )),
    }
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "tts_relay=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "tts_relay=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
