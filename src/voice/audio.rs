//! PCM/WAV helpers for speech APIs

use std::io::Cursor;

use crate::{Error, Result};

/// Check for a `RIFF....WAVE` header
#[must_use]
pub fn is_wav(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE"
}

/// Interpret bytes as little-endian signed 16-bit samples
///
/// A trailing odd byte is ignored.
#[must_use]
pub fn pcm16_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Wrap raw mono PCM16 in a WAV container for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    encode_wav(spec, &pcm16_samples(pcm))
}

/// Return WAV bytes, wrapping raw PCM16 when no WAV header is present
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn ensure_wav(audio: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    if is_wav(audio) {
        Ok(audio.to_vec())
    } else {
        pcm16_to_wav(audio, sample_rate)
    }
}

/// Decode a 16-bit integer WAV into its spec and samples
///
/// # Errors
///
/// Returns error if the data is not a readable 16-bit PCM WAV
pub fn decode_wav(wav: &[u8]) -> Result<(hound::WavSpec, Vec<i16>)> {
    let reader = hound::WavReader::new(Cursor::new(wav)).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(Error::Audio(format!(
            "unsupported WAV format: {} bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Audio(e.to_string()))?;

    Ok((spec, samples))
}

fn encode_wav(spec: hound::WavSpec, samples: &[i16]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// RMS level of PCM16 samples normalised to `0.0..=1.0`
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn audio_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| f64::from(s).powi(2)).sum();
    let rms = (sum_squares / samples.len() as f64).sqrt();
    (rms / 32768.0).min(1.0) as f32
}

/// Level of incoming audio, decoding WAV input when present
#[must_use]
pub fn input_level(audio: &[u8]) -> f32 {
    if is_wav(audio) {
        decode_wav(audio).map_or(0.0, |(_, samples)| audio_level(&samples))
    } else {
        audio_level(&pcm16_samples(audio))
    }
}

/// Scale every sample of a 16-bit WAV by `volume`
///
/// # Errors
///
/// Returns error if the WAV cannot be decoded or re-encoded
pub fn scale_wav_volume(wav: &[u8], volume: f32) -> Result<Vec<u8>> {
    let (spec, samples) = decode_wav(wav)?;
    let gain = volume.clamp(0.0, 1.0);

    #[allow(clippy::cast_possible_truncation)]
    let scaled: Vec<i16> = samples
        .iter()
        .map(|&s| (f32::from(s) * gain).round() as i16)
        .collect();

    encode_wav(spec, &scaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_pcm_to_wav_header() {
        let pcm = pcm_bytes(&[0, 1000, -1000, 32767]);
        let wav = pcm16_to_wav(&pcm, 16_000).unwrap();

        assert!(is_wav(&wav));
        assert!(wav.len() > pcm.len());

        let (spec, samples) = decode_wav(&wav).unwrap();
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.channels, 1);
        assert_eq!(samples, vec![0, 1000, -1000, 32767]);
    }

    #[test]
    fn test_odd_trailing_byte_dropped() {
        let mut pcm = pcm_bytes(&[5, 6]);
        pcm.push(0x7f);
        assert_eq!(pcm16_samples(&pcm), vec![5, 6]);
    }

    #[test]
    fn test_ensure_wav_passthrough() {
        let wav = pcm16_to_wav(&pcm_bytes(&[1, 2, 3]), 8000).unwrap();
        assert_eq!(ensure_wav(&wav, 16_000).unwrap(), wav);
    }

    #[test]
    fn test_audio_level() {
        assert!(audio_level(&[]).abs() < f32::EPSILON);
        assert!(audio_level(&[0, 0, 0]).abs() < f32::EPSILON);

        let full = audio_level(&[i16::MIN, i16::MIN]);
        assert!((full - 1.0).abs() < 1e-6);

        let half = audio_level(&[16384, -16384]);
        assert!((half - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_input_level_decodes_wav() {
        let wav = pcm16_to_wav(&pcm_bytes(&[16384, -16384]), 16_000).unwrap();
        assert!((input_level(&wav) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_scale_volume() {
        let wav = pcm16_to_wav(&pcm_bytes(&[1000, -2000]), 24_000).unwrap();
        let scaled = scale_wav_volume(&wav, 0.5).unwrap();

        let (spec, samples) = decode_wav(&scaled).unwrap();
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(samples, vec![500, -1000]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_wav(b"not a wav file").is_err());
    }
}
