use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tts_relay::domain::audio::PlaybackError;
use tts_relay::domain::cache::{CacheEntry, CacheError, Clock};
use tts_relay::infrastructure::audio::{AudioDevice, AudioOutput};
use tts_relay::infrastructure::repositories::{CacheStore, MemoryCacheStore};

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()),
        })
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock().unwrap() += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Store whose reads and/or writes fail, counting every attempt
#[derive(Default)]
pub struct FailingStore {
    pub fail_get: bool,
    pub fail_put: bool,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get {
            return Err(CacheError::Unavailable("store offline".to_string()));
        }
        Ok(None)
    }

    async fn put(&self, _entry: CacheEntry) -> Result<(), CacheError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_put {
            return Err(CacheError::Unavailable("disk full".to_string()));
        }
        Ok(())
    }
}

/// In-memory store that remembers every key it was asked to write
pub struct KeyRecordingStore {
    inner: MemoryCacheStore,
    pub keys: Mutex<Vec<String>>,
}

impl KeyRecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCacheStore::new(100),
            keys: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CacheStore for KeyRecordingStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.keys.lock().unwrap().push(entry.key.clone());
        self.inner.put(entry).await
    }
}

/// Output that records every sample, optionally pausing after each write
#[derive(Default)]
pub struct RecordingOutput {
    pub samples: Arc<Mutex<Vec<f32>>>,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub write_delay_ms: u64,
}

impl RecordingOutput {
    pub fn slow(write_delay_ms: u64) -> Self {
        Self {
            write_delay_ms,
            ..Self::default()
        }
    }
}

struct RecordingDevice {
    samples: Arc<Mutex<Vec<f32>>>,
    closed: Arc<AtomicUsize>,
    is_closed: AtomicBool,
    write_delay_ms: u64,
}

#[async_trait]
impl AudioOutput for RecordingOutput {
    async fn open(&self, _sample_rate: u32, _channels: u16) -> Result<Box<dyn AudioDevice>, PlaybackError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingDevice {
            samples: self.samples.clone(),
            closed: self.closed.clone(),
            is_closed: AtomicBool::new(false),
            write_delay_ms: self.write_delay_ms,
        }))
    }
}

#[async_trait]
impl AudioDevice for RecordingDevice {
    async fn write(&mut self, samples: &[f32]) -> Result<(), PlaybackError> {
        self.samples.lock().unwrap().extend_from_slice(samples);
        if self.write_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.write_delay_ms)).await;
        }
        Ok(())
    }

    async fn drain(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn close(&mut self) {
        if !self.is_closed.swap(true, Ordering::SeqCst) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// 16-bit mono WAV containing a sine wave with the given RMS
pub fn sine_wav(rms: f32, frequency: f32, sample_rate: u32, frames: usize) -> Vec<u8> {
    let amplitude = rms * std::f32::consts::SQRT_2;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let sample = amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin();
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
