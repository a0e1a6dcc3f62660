use crate::domain::audio::{ChainParams, NormalizationParams};
use crate::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_format: LogFormat,
    // Remote synthesis API
    pub tts_api_url: String,
    pub tts_api_key: Option<String>,
    pub tts_model: String,
    pub tts_voice: String,
    pub http_timeout: Duration,
    // Response cache
    pub cache_backend: CacheBackend,
    pub cache_database_url: String,
    pub cache_max_capacity: u64,
    pub cache_default_max_age: Duration,
    pub cache_hash_keys: bool,
    // Audio
    pub normalize_audio: bool,
    pub normalization: NormalizationParams,
    pub chain: ChainParams,
    pub audio_output: AudioOutputKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioOutputKind {
    WavFile(PathBuf),
    Device,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build a config from any variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let defaults = NormalizationParams::default();
        let normalization = NormalizationParams {
            target_rms: parse(&lookup, "NORMALIZE_TARGET_RMS", defaults.target_rms)?,
            limiter_threshold: parse(&lookup, "NORMALIZE_LIMITER_THRESHOLD", defaults.limiter_threshold)?,
        };
        normalization
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let mut chain = ChainParams::default();
        chain.output_gain = parse(&lookup, "PLAYBACK_OUTPUT_GAIN", chain.output_gain)?;
        chain.validate().map_err(|e| AppError::Config(e.to_string()))?;

        let config = Config {
            log_format: match var("LOG_FORMAT", "pretty").to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            tts_api_url: var("TTS_API_URL", "https://api.openai.com/v1"),
            tts_api_key: lookup("TTS_API_KEY").filter(|key| !key.is_empty()),
            tts_model: var("TTS_MODEL", "tts-1"),
            tts_voice: var("TTS_VOICE", "alloy"),
            http_timeout: Duration::from_secs(parse(&lookup, "HTTP_TIMEOUT_SECS", 60u64)?),
            cache_backend: match var("CACHE_BACKEND", "memory").to_lowercase().as_str() {
                "memory" => CacheBackend::Memory,
                "sqlite" => CacheBackend::Sqlite,
                other => {
                    return Err(AppError::Config(format!(
                        "CACHE_BACKEND must be 'memory' or 'sqlite', got '{}'",
                        other
                    )))
                }
            },
            cache_database_url: var("CACHE_DATABASE_URL", "sqlite://tts-relay-cache.db?mode=rwc"),
            cache_max_capacity: parse(&lookup, "CACHE_MAX_CAPACITY", 1000u64)?,
            cache_default_max_age: Duration::from_secs(parse(&lookup, "CACHE_DEFAULT_MAX_AGE_SECS", 3600u64)?),
            cache_hash_keys: parse_bool(&lookup, "CACHE_HASH_KEYS", true),
            normalize_audio: parse_bool(&lookup, "NORMALIZE_AUDIO", true),
            normalization,
            chain,
            audio_output: match var("AUDIO_OUTPUT", "wav").to_lowercase().as_str() {
                "wav" => AudioOutputKind::WavFile(PathBuf::from(var("AUDIO_OUTPUT_PATH", "utterance.wav"))),
                "device" => AudioOutputKind::Device,
                other => {
                    return Err(AppError::Config(format!(
                        "AUDIO_OUTPUT must be 'wav' or 'device', got '{}'",
                        other
                    )))
                }
            },
        };

        Ok(config)
    }
}

fn parse<F, T>(lookup: &F, name: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{} has invalid value '{}': {}", name, raw, e))),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}
