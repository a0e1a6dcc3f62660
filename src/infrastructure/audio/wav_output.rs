use super::{AudioDevice, AudioOutput};
use crate::domain::audio::PlaybackError;
use async_trait::async_trait;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Renders each utterance into a 32-bit float WAV file, overwriting the previous one.
pub struct WavFileOutput {
    path: PathBuf,
}

impl WavFileOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AudioOutput for WavFileOutput {
    async fn open(&self, sample_rate: u32, channels: u16) -> Result<Box<dyn AudioDevice>, PlaybackError> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let path = self.path.clone();
        let writer = tokio::task::spawn_blocking(move || hound::WavWriter::create(&path, spec))
            .await
            .map_err(|e| PlaybackError::Device(format!("WAV open task failed: {}", e)))?
            .map_err(|e| PlaybackError::Device(format!("cannot create {}: {}", self.path.display(), e)))?;

        tracing::debug!(path = %self.path.display(), sample_rate, channels, "WAV output opened");
        Ok(Box::new(WavFileDevice {
            path: self.path.clone(),
            writer: Some(writer),
        }))
    }
}

type Writer = hound::WavWriter<BufWriter<File>>;

struct WavFileDevice {
    path: PathBuf,
    writer: Option<Writer>,
}

impl WavFileDevice {
    fn take_writer(&mut self) -> Result<Writer, PlaybackError> {
        self.writer
            .take()
            .ok_or_else(|| PlaybackError::Device("WAV output already closed".to_string()))
    }
}

#[async_trait]
impl AudioDevice for WavFileDevice {
    async fn write(&mut self, samples: &[f32]) -> Result<(), PlaybackError> {
        let mut writer = self.take_writer()?;
        let samples = samples.to_vec();

        // File I/O runs on the blocking pool; the writer comes back with the result.
        // If this future is dropped mid-write, dropping the writer finalizes the file.
        let (writer, result) = tokio::task::spawn_blocking(move || {
            let result = samples.iter().try_for_each(|&sample| writer.write_sample(sample));
            (writer, result)
        })
        .await
        .map_err(|e| PlaybackError::Device(format!("WAV write task failed: {}", e)))?;

        self.writer = Some(writer);
        result.map_err(|e| PlaybackError::Device(format!("WAV write failed: {}", e)))
    }

    async fn drain(&mut self) -> Result<(), PlaybackError> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || writer.finalize())
            .await
            .map_err(|e| PlaybackError::Device(format!("WAV finalize task failed: {}", e)))?
            .map_err(|e| PlaybackError::Device(format!("WAV finalize failed: {}", e)))
    }

    /// Synchronous so it can run from `Drop`; only the buffered tail and header are flushed here
    fn close(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                tracing::warn!(error = %e, path = %self.path.display(), "Failed to finalize WAV output");
            }
        }
    }
}
