use super::error::AudioError;
use super::model::AudioBuffer;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode a compressed payload (MP3, WAV, raw PCM containers) into planar f32 audio.
pub fn decode_audio(bytes: &[u8]) -> Result<AudioBuffer, AudioError> {
    if bytes.is_empty() {
        return Err(AudioError::Decode("empty payload".to_string()));
    }

    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("unrecognised format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("unsupported codec: {}", e)))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channel_count = 0usize;
    let mut sample_rate = 0u32;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channel_count = spec.channels.count();
                sample_rate = spec.rate;

                let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                samples.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(samples.samples());
            }
            // Corrupt frame: skip it, like a player would
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = %e, "Skipping undecodable audio packet");
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        }
    }

    if channel_count == 0 {
        return Err(AudioError::Decode("payload contained no audio frames".to_string()));
    }

    let buffer = AudioBuffer::from_interleaved(&interleaved, channel_count, sample_rate)?;
    tracing::debug!(
        channels = buffer.channel_count(),
        sample_rate = buffer.sample_rate(),
        frames = buffer.len(),
        "Audio payload decoded"
    );
    Ok(buffer)
}
