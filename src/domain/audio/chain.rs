use super::error::AudioError;
use super::model::{AudioBuffer, ChainParams, DynamicsParams};

const MIN_LEVEL_DB: f32 = -120.0;

fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        MIN_LEVEL_DB
    } else {
        (20.0 * amplitude.log10()).max(MIN_LEVEL_DB)
    }
}

fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// One-pole smoothing coefficient for a time constant in seconds
fn smoothing_coefficient(time_secs: f32, sample_rate: u32) -> f32 {
    if time_secs <= 0.0 {
        0.0
    } else {
        (-1.0 / (time_secs * sample_rate as f32)).exp()
    }
}

/// Feed-forward dynamics stage with a soft knee and attack/release smoothing.
///
/// Channels are linked: the detector follows the loudest channel of each
/// frame and the same gain is applied to all of them.
#[derive(Debug, Clone, Copy)]
pub struct DynamicsProcessor {
    params: DynamicsParams,
}

impl DynamicsProcessor {
    pub fn new(params: DynamicsParams) -> Self {
        Self { params }
    }

    /// Static curve: output level in dB for an input level in dB
    pub fn transfer_db(&self, level_db: f32) -> f32 {
        let DynamicsParams {
            threshold_db,
            knee_db,
            ratio,
            ..
        } = self.params;
        let over = level_db - threshold_db;

        if knee_db > 0.0 && over.abs() * 2.0 <= knee_db {
            let x = over + knee_db / 2.0;
            level_db + (1.0 / ratio - 1.0) * x * x / (2.0 * knee_db)
        } else if over > 0.0 {
            threshold_db + over / ratio
        } else {
            level_db
        }
    }

    pub fn process(&self, buffer: &AudioBuffer) -> AudioBuffer {
        let attack = smoothing_coefficient(self.params.attack_secs, buffer.sample_rate());
        let release = smoothing_coefficient(self.params.release_secs, buffer.sample_rate());
        let input = buffer.channels();

        let mut output: Vec<Vec<f32>> = input.iter().map(|c| Vec::with_capacity(c.len())).collect();
        // Current gain reduction in dB, always <= 0
        let mut envelope_db = 0.0f32;

        for frame in 0..buffer.len() {
            let peak = input.iter().map(|c| c[frame].abs()).fold(0.0f32, f32::max);
            let level_db = amplitude_to_db(peak);
            let target_db = self.transfer_db(level_db) - level_db;

            // More reduction needed: attack. Less: release.
            let coefficient = if target_db < envelope_db { attack } else { release };
            envelope_db = coefficient * envelope_db + (1.0 - coefficient) * target_db;

            let gain = db_to_amplitude(envelope_db);
            for (out, channel) in output.iter_mut().zip(input) {
                out.push(channel[frame] * gain);
            }
        }

        buffer.with_channels(output)
    }
}

/// Compressor, then limiter, then a fixed output gain.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackChain {
    compressor: DynamicsProcessor,
    limiter: DynamicsProcessor,
    output_gain: f32,
}

impl Default for PlaybackChain {
    fn default() -> Self {
        let params = ChainParams::default();
        Self {
            compressor: DynamicsProcessor::new(params.compressor),
            limiter: DynamicsProcessor::new(params.limiter),
            output_gain: params.output_gain,
        }
    }
}

impl PlaybackChain {
    pub fn new(params: ChainParams) -> Result<Self, AudioError> {
        params.validate()?;
        Ok(Self {
            compressor: DynamicsProcessor::new(params.compressor),
            limiter: DynamicsProcessor::new(params.limiter),
            output_gain: params.output_gain,
        })
    }

    pub fn process(&self, buffer: &AudioBuffer) -> AudioBuffer {
        let compressed = self.compressor.process(buffer);
        let limited = self.limiter.process(&compressed);

        let channels = limited
            .channels()
            .iter()
            .map(|channel| channel.iter().map(|&s| (s * self.output_gain).clamp(-1.0, 1.0)).collect())
            .collect();
        limited.with_channels(channels)
    }
}
