use super::error::AudioError;
use super::model::{AudioBuffer, NormalizationParams};

/// Root mean square of a sample slice. Zero for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_of_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_of_squares / samples.len() as f64).sqrt() as f32
}

/// Bend magnitudes above `threshold` toward 1.0 with a tanh curve, keeping the sign.
///
/// `T + (1 - T) * tanh((|x| - T) / (1 - T))` never exceeds 1.0.
pub fn soft_limit(sample: f64, threshold: f64) -> f64 {
    let magnitude = sample.abs();
    if magnitude <= threshold {
        return sample;
    }
    let headroom = 1.0 - threshold;
    let limited = threshold + headroom * ((magnitude - threshold) / headroom).tanh();
    limited.copysign(sample)
}

/// Rescales each channel to a target RMS and soft-limits the peaks.
#[derive(Debug, Clone, Copy)]
pub struct AudioNormalizer {
    params: NormalizationParams,
}

impl Default for AudioNormalizer {
    fn default() -> Self {
        Self {
            params: NormalizationParams::default(),
        }
    }
}

impl AudioNormalizer {
    pub fn new(params: NormalizationParams) -> Result<Self, AudioError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &NormalizationParams {
        &self.params
    }

    /// Normalize to the configured target RMS
    pub fn normalize(&self, buffer: &AudioBuffer) -> AudioBuffer {
        self.apply(buffer, self.params.target_rms)
    }

    /// Normalize every channel independently to `target_rms`, which must be in (0, 1].
    ///
    /// A silent channel keeps unity gain. Output samples are always within [-1, 1].
    pub fn normalize_to(&self, buffer: &AudioBuffer, target_rms: f32) -> Result<AudioBuffer, AudioError> {
        NormalizationParams {
            target_rms,
            ..self.params
        }
        .validate()?;
        Ok(self.apply(buffer, target_rms))
    }

    fn apply(&self, buffer: &AudioBuffer, target_rms: f32) -> AudioBuffer {
        let threshold = self.params.limiter_threshold as f64;

        let channels = buffer
            .channels()
            .iter()
            .map(|samples| {
                let level = rms(samples) as f64;
                let gain = if level > 0.0 { target_rms as f64 / level } else { 1.0 };

                samples
                    .iter()
                    .map(|&sample| {
                        let limited = soft_limit(sample as f64 * gain, threshold);
                        // Guard against out-of-range input when gain is 1
                        limited.clamp(-1.0, 1.0) as f32
                    })
                    .collect()
            })
            .collect();

        let normalized = buffer.with_channels(channels);
        tracing::debug!(
            channels = buffer.channel_count(),
            frames = buffer.len(),
            target_rms = target_rms,
            "Audio normalized"
        );
        normalized
    }
}
