pub mod chain;
pub mod decoder;
pub mod error;
pub mod model;
pub mod normalizer;
pub mod playback;

pub use chain::{DynamicsProcessor, PlaybackChain};
pub use decoder::decode_audio;
pub use error::{AudioError, PlaybackError};
pub use model::{AudioBuffer, ChainParams, DynamicsParams, NormalizationParams};
pub use normalizer::{rms, soft_limit, AudioNormalizer};
pub use playback::{Playback, PlaybackCallback, PlaybackState};
