/// Failures while turning a payload into processed PCM.
/// Fatal for the utterance: normalization is never silently skipped.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to decode audio: {0}")]
    Decode(String),
    #[error("no decodable audio track in payload")]
    NoAudioTrack,
    #[error("invalid audio buffer: {0}")]
    InvalidBuffer(String),
    #[error("invalid processing parameters: {0}")]
    InvalidParams(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("audio device error: {0}")]
    Device(String),
    #[error("playback already started")]
    AlreadyStarted,
    #[error("playback failed: {0}")]
    Failed(String),
}
