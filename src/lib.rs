//! Text-to-speech relay: a resilient response cache in front of a remote
//! synthesis API, plus loudness normalization and a dynamics chain for playback.

pub mod domain;
pub mod error;
pub mod infrastructure;
