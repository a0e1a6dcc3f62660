pub mod wav_output;
#[cfg(feature = "device")]
pub mod device_output;

pub use wav_output::WavFileOutput;
#[cfg(feature = "device")]
pub use device_output::DeviceOutput;

use crate::domain::audio::PlaybackError;
use async_trait::async_trait;

/// Something that can play utterances: a sound card, a file, a test recorder.
///
/// Each utterance opens its own device and must close it when done or stopped.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn open(&self, sample_rate: u32, channels: u16) -> Result<Box<dyn AudioDevice>, PlaybackError>;
}

/// An open playback resource for one utterance.
#[async_trait]
pub trait AudioDevice: Send {
    /// Queue interleaved frames
    async fn write(&mut self, samples: &[f32]) -> Result<(), PlaybackError>;

    /// Wait until everything written has been played
    async fn drain(&mut self) -> Result<(), PlaybackError>;

    /// Release the underlying resource. Must be safe to call more than once.
    fn close(&mut self);
}
