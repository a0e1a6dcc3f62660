use super::error::PlaybackError;
use super::model::AudioBuffer;
use crate::infrastructure::audio::{AudioDevice, AudioOutput};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Frames handed to the device per write
const CHUNK_FRAMES: usize = 4096;

/// Playback event handler
pub type PlaybackCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Finished,
    Stopped,
    Failed(String),
}

impl PlaybackState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Stopped | Self::Failed(_))
    }
}

/// Holds at most one handler; setting a new one replaces the old one.
#[derive(Clone, Default)]
struct CallbackSlot(Arc<Mutex<Option<PlaybackCallback>>>);

impl CallbackSlot {
    fn set(&self, callback: PlaybackCallback) {
        *lock(&self.0) = Some(callback);
    }

    fn fire(&self) {
        // Clone out of the lock so a handler may re-register itself
        let callback = lock(&self.0).clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Closes the device when the playback task ends, including when it is aborted.
struct DeviceGuard(Box<dyn AudioDevice>);

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// One utterance on its way to an output device.
///
/// `start` may be called once. `stop` halts the signal, releases the device
/// before returning, and guarantees the end handler will not fire afterwards.
pub struct Playback {
    output: Arc<dyn AudioOutput>,
    buffer: Arc<AudioBuffer>,
    on_start: CallbackSlot,
    on_end: CallbackSlot,
    state: Arc<watch::Sender<PlaybackState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Playback {
    pub fn new(output: Arc<dyn AudioOutput>, buffer: AudioBuffer) -> Self {
        let (state, _) = watch::channel(PlaybackState::Idle);
        Self {
            output,
            buffer: Arc::new(buffer),
            on_start: CallbackSlot::default(),
            on_end: CallbackSlot::default(),
            state: Arc::new(state),
            task: Mutex::new(None),
        }
    }

    /// Replaces any previously set start handler
    pub fn set_on_start(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.on_start.set(Arc::new(callback));
    }

    /// Replaces any previously set end handler
    pub fn set_on_end(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.on_end.set(Arc::new(callback));
    }

    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    pub fn start(&self) -> Result<(), PlaybackError> {
        let started = self.state.send_if_modified(|state| {
            if *state == PlaybackState::Idle {
                *state = PlaybackState::Playing;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(PlaybackError::AlreadyStarted);
        }

        let task = tokio::spawn(run(
            self.output.clone(),
            self.buffer.clone(),
            self.on_start.clone(),
            self.on_end.clone(),
            self.state.clone(),
        ));
        *lock(&self.task) = Some(task);
        Ok(())
    }

    /// Halt playback and release the device. A no-op once playback has ended.
    pub async fn stop(&self) {
        let stopped = self.state.send_if_modified(|state| {
            if matches!(state, PlaybackState::Idle | PlaybackState::Playing) {
                *state = PlaybackState::Stopped;
                true
            } else {
                false
            }
        });

        let task = lock(&self.task).take();
        if let Some(task) = task {
            task.abort();
            // Aborted tasks are dropped, and their device closed, before the join resolves
            let _ = task.await;
        }

        if stopped {
            tracing::info!("Playback stopped");
        }
    }

    /// Wait until playback finishes, is stopped, or fails
    pub async fn wait(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.subscribe();
        loop {
            match &*state.borrow_and_update() {
                PlaybackState::Finished | PlaybackState::Stopped => return Ok(()),
                PlaybackState::Failed(reason) => return Err(PlaybackError::Failed(reason.clone())),
                PlaybackState::Idle | PlaybackState::Playing => {}
            }
            if state.changed().await.is_err() {
                return Ok(());
            }
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

async fn run(
    output: Arc<dyn AudioOutput>,
    buffer: Arc<AudioBuffer>,
    on_start: CallbackSlot,
    on_end: CallbackSlot,
    state: Arc<watch::Sender<PlaybackState>>,
) {
    match play(output.as_ref(), &buffer, &on_start, &state).await {
        Ok(()) => {
            // Only a playback that was not stopped meanwhile reports its end
            let finished = state.send_if_modified(|s| {
                if *s == PlaybackState::Playing {
                    *s = PlaybackState::Finished;
                    true
                } else {
                    false
                }
            });
            if finished {
                tracing::debug!(frames = buffer.len(), "Playback finished");
                on_end.fire();
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Playback failed");
            state.send_if_modified(|s| {
                if *s == PlaybackState::Playing {
                    *s = PlaybackState::Failed(e.to_string());
                    true
                } else {
                    false
                }
            });
        }
    }
}

async fn play(
    output: &dyn AudioOutput,
    buffer: &AudioBuffer,
    on_start: &CallbackSlot,
    state: &watch::Sender<PlaybackState>,
) -> Result<(), PlaybackError> {
    let channels = u16::try_from(buffer.channel_count())
        .map_err(|_| PlaybackError::Device(format!("too many channels: {}", buffer.channel_count())))?;
    let mut device = DeviceGuard(output.open(buffer.sample_rate(), channels).await?);

    tracing::debug!(
        channels = channels,
        sample_rate = buffer.sample_rate(),
        duration_ms = buffer.duration().as_millis() as u64,
        "Playback started"
    );
    on_start.fire();

    let mut frame = 0;
    while frame < buffer.len() {
        if *state.borrow() != PlaybackState::Playing {
            return Ok(());
        }
        let end = (frame + CHUNK_FRAMES).min(buffer.len());
        device.0.write(&buffer.interleaved_range(frame, end)).await?;
        frame = end;
    }
    device.0.drain().await
}
