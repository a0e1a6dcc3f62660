use super::error::AudioError;
use std::time::Duration;

/// Decoded PCM audio, one sample vector per channel.
///
/// All channels share `sample_rate` and length. Processing stages never
/// mutate a buffer in place; they return a new one of the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, AudioError> {
        let Some(first) = channels.first() else {
            return Err(AudioError::InvalidBuffer("buffer has no channels".to_string()));
        };
        if sample_rate == 0 {
            return Err(AudioError::InvalidBuffer("sample rate must be positive".to_string()));
        }
        let length = first.len();
        if let Some((index, channel)) = channels.iter().enumerate().find(|(_, c)| c.len() != length) {
            return Err(AudioError::InvalidBuffer(format!(
                "channel {} has {} samples, expected {}",
                index,
                channel.len(),
                length
            )));
        }
        if let Some((index, sample)) = channels
            .iter()
            .flat_map(|c| c.iter().enumerate())
            .find(|(_, s)| !s.is_finite())
        {
            return Err(AudioError::InvalidBuffer(format!(
                "non-finite sample {} at frame {}",
                sample, index
            )));
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Split an interleaved frame sequence into channels
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self, AudioError> {
        if channel_count == 0 || samples.len() % channel_count != 0 {
            return Err(AudioError::InvalidBuffer(format!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(),
                channel_count
            )));
        }
        let mut channels = vec![Vec::with_capacity(samples.len() / channel_count); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Build a buffer of the same sample rate from already validated channels
    pub(crate) fn with_channels(&self, channels: Vec<Vec<f32>>) -> Self {
        debug_assert_eq!(channels.len(), self.channels.len());
        Self {
            channels,
            sample_rate: self.sample_rate,
        }
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.len() as f64 / self.sample_rate as f64)
    }

    /// Interleaved samples for frames `start..end`
    pub fn interleaved_range(&self, start: usize, end: usize) -> Vec<f32> {
        let end = end.min(self.len());
        let start = start.min(end);
        let mut out = Vec::with_capacity((end - start) * self.channels.len());
        for frame in start..end {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    pub fn interleaved(&self) -> Vec<f32> {
        self.interleaved_range(0, self.len())
    }
}

/// Loudness normalization settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationParams {
    pub target_rms: f32,
    /// Magnitude above which the soft limiter starts bending samples toward 1.0
    pub limiter_threshold: f32,
}

impl Default for NormalizationParams {
    fn default() -> Self {
        Self {
            target_rms: 0.2,
            limiter_threshold: 0.8,
        }
    }
}

impl NormalizationParams {
    pub fn validate(&self) -> Result<(), AudioError> {
        if !(self.target_rms > 0.0 && self.target_rms <= 1.0) {
            return Err(AudioError::InvalidParams(format!(
                "target RMS must be in (0, 1], got {}",
                self.target_rms
            )));
        }
        if !(self.limiter_threshold > 0.0 && self.limiter_threshold < 1.0) {
            return Err(AudioError::InvalidParams(format!(
                "limiter threshold must be in (0, 1), got {}",
                self.limiter_threshold
            )));
        }
        Ok(())
    }
}

/// Parameters for one dynamics stage (compressor or limiter)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsParams {
    pub threshold_db: f32,
    pub knee_db: f32,
    pub ratio: f32,
    pub attack_secs: f32,
    pub release_secs: f32,
}

impl DynamicsParams {
    /// Wide knee, high ratio, fast attack, slow release
    pub fn compressor() -> Self {
        Self {
            threshold_db: -24.0,
            knee_db: 30.0,
            ratio: 12.0,
            attack_secs: 0.003,
            release_secs: 0.25,
        }
    }

    /// Hard knee, very fast attack and release
    pub fn limiter() -> Self {
        Self {
            threshold_db: -2.0,
            knee_db: 0.0,
            ratio: 20.0,
            attack_secs: 0.001,
            release_secs: 0.01,
        }
    }

    pub fn validate(&self) -> Result<(), AudioError> {
        if self.ratio < 1.0 {
            return Err(AudioError::InvalidParams(format!("ratio must be >= 1, got {}", self.ratio)));
        }
        if self.knee_db < 0.0 || self.attack_secs < 0.0 || self.release_secs < 0.0 {
            return Err(AudioError::InvalidParams(
                "knee, attack and release must not be negative".to_string(),
            ));
        }
        if self.threshold_db > 0.0 {
            return Err(AudioError::InvalidParams(format!(
                "threshold must be at or below 0 dBFS, got {}",
                self.threshold_db
            )));
        }
        Ok(())
    }
}

/// Stages applied between the normalizer and the output device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainParams {
    pub compressor: DynamicsParams,
    pub limiter: DynamicsParams,
    pub output_gain: f32,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            compressor: DynamicsParams::compressor(),
            limiter: DynamicsParams::limiter(),
            output_gain: 0.9,
        }
    }
}

impl ChainParams {
    pub fn validate(&self) -> Result<(), AudioError> {
        self.compressor.validate()?;
        self.limiter.validate()?;
        if !(self.output_gain > 0.0 && self.output_gain <= 1.0) {
            return Err(AudioError::InvalidParams(format!(
                "output gain must be in (0, 1], got {}",
                self.output_gain
            )));
        }
        Ok(())
    }
}
