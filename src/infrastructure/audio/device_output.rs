use super::{AudioDevice, AudioOutput};
use crate::domain::audio::PlaybackError;
use async_trait::async_trait;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use std::sync::mpsc;
use std::sync::Arc;

/// Plays utterances on the default output device.
///
/// The output stream is not `Send`, so each utterance keeps it on a dedicated
/// thread that lives until the device is closed.
#[derive(Debug, Default)]
pub struct DeviceOutput;

impl DeviceOutput {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioOutput for DeviceOutput {
    async fn open(&self, sample_rate: u32, channels: u16) -> Result<Box<dyn AudioDevice>, PlaybackError> {
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("tts-relay-audio".to_string())
            .spawn(move || {
                let opened = OutputStream::try_default()
                    .map_err(|e| PlaybackError::Device(e.to_string()))
                    .and_then(|(stream, handle)| {
                        Sink::try_new(&handle)
                            .map(|sink| (stream, Arc::new(sink)))
                            .map_err(|e| PlaybackError::Device(e.to_string()))
                    });
                match opened {
                    Ok((stream, sink)) => {
                        if ready_tx.send(Ok(sink)).is_err() {
                            return;
                        }
                        // Park until the device is closed or dropped, then release the stream
                        let _ = shutdown_rx.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| PlaybackError::Device(format!("cannot spawn audio thread: {}", e)))?;

        let sink = ready_rx
            .await
            .map_err(|_| PlaybackError::Device("audio thread exited before opening".to_string()))??;

        tracing::debug!(sample_rate, channels, "Output device opened");
        Ok(Box::new(RodioDevice {
            sink,
            sample_rate,
            channels,
            shutdown: Some(shutdown_tx),
        }))
    }
}

struct RodioDevice {
    sink: Arc<Sink>,
    sample_rate: u32,
    channels: u16,
    shutdown: Option<mpsc::Sender<()>>,
}

#[async_trait]
impl AudioDevice for RodioDevice {
    async fn write(&mut self, samples: &[f32]) -> Result<(), PlaybackError> {
        if self.shutdown.is_none() {
            return Err(PlaybackError::Device("output device already closed".to_string()));
        }
        self.sink
            .append(SamplesBuffer::new(self.channels, self.sample_rate, samples.to_vec()));
        Ok(())
    }

    async fn drain(&mut self) -> Result<(), PlaybackError> {
        let sink = self.sink.clone();
        tokio::task::spawn_blocking(move || sink.sleep_until_end())
            .await
            .map_err(|e| PlaybackError::Device(format!("drain task failed: {}", e)))
    }

    fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            self.sink.stop();
            let _ = shutdown.send(());
            tracing::debug!("Output device closed");
        }
    }
}

impl Drop for RodioDevice {
    fn drop(&mut self) {
        self.close();
    }
}
