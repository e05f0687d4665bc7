use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::types::PcmBuffer;
use crate::error::{AudioError, Result};

/// Turns an encoded audio byte stream into PCM
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<PcmBuffer>;
}

/// Decoder backed by hound (WAV) and symphonia (everything else)
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    extension_hint: Option<String>,
}

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Help the format probe with the source file's extension
    pub fn with_extension_hint<S: Into<String>>(extension: S) -> Self {
        Self {
            extension_hint: Some(extension.into().to_lowercase()),
        }
    }

    /// Check if a file extension is likely decodable
    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac"
        )
    }

    fn is_wav(bytes: &[u8]) -> bool {
        bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
    }

    /// Decode WAV with hound (most reliable for WAV)
    fn decode_wav(bytes: &[u8]) -> Result<PcmBuffer> {
        let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| AudioError::Decode {
            reason: format!("invalid WAV data: {}", e),
        })?;

        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| AudioError::Decode {
                    reason: format!("corrupt WAV samples: {}", e),
                })?,
            hound::SampleFormat::Int => {
                let bit_depth = spec.bits_per_sample;
                reader
                    .into_samples::<i32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| AudioError::Decode {
                        reason: format!("corrupt WAV samples: {}", e),
                    })?
                    .into_iter()
                    .map(|sample| Self::int_to_float(sample, bit_depth))
                    .collect()
            }
        };

        Ok(PcmBuffer::new(samples, spec.sample_rate, spec.channels))
    }

    /// Decode any other container symphonia knows about
    fn decode_with_symphonia(&self, bytes: &[u8]) -> Result<PcmBuffer> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = &self.extension_hint {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| AudioError::Decode {
                reason: format!("unrecognised audio format: {}", e),
            })?;

        let mut format = probed.format;

        // Find the first audio track with a known (decodable) codec
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::Decode {
                reason: "no decodable audio track".to_string(),
            })?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.ok_or_else(|| AudioError::Decode {
            reason: "no sample rate found".to_string(),
        })?;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Decode {
                reason: format!("unsupported codec: {}", e),
            })?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    return Err(AudioError::Decode {
                        reason: format!("failed to read packet: {}", e),
                    }
                    .into())
                }
            };

            // Consume any new metadata
            while !format.metadata().is_latest() {
                format.metadata().pop();
            }

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(AudioError::Decode {
                        reason: format!("decoder failure: {}", e),
                    }
                    .into())
                }
            };

            let spec = *decoded.spec();
            channels.get_or_insert(spec.channels.count() as u16);

            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buffer.samples());
        }

        Ok(PcmBuffer::new(samples, sample_rate, channels.unwrap_or(1)))
    }

    /// Convert integer sample to float (-1.0 to 1.0)
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        match bit_depth {
            8 => (sample as f32 - 128.0) / 128.0,
            16 => sample as f32 / 32768.0,
            24 => sample as f32 / 8388608.0,
            32 => sample as f32 / 2147483648.0,
            _ => sample as f32 / 32768.0,
        }
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<PcmBuffer> {
        if bytes.is_empty() {
            return Err(AudioError::Decode {
                reason: "empty audio stream".to_string(),
            }
            .into());
        }

        let pcm = if Self::is_wav(bytes) {
            Self::decode_wav(bytes)?
        } else {
            self.decode_with_symphonia(bytes)?
        };

        if pcm.sample_rate() == 0 || pcm.frame_count() == 0 {
            return Err(AudioError::Decode {
                reason: "audio stream contains no samples".to_string(),
            }
            .into());
        }

        tracing::info!(
            "Decoded audio: {:.1}s, {} Hz, {} channels",
            pcm.duration(),
            pcm.sample_rate(),
            pcm.channels()
        );

        Ok(pcm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_in_memory_wav() {
        let samples: Vec<i16> = (0..8000).map(|i| ((i % 100) as i16 - 50) * 100).collect();
        let bytes = wav_bytes(&samples, 8000, 2);

        let pcm = SymphoniaDecoder::new().decode(&bytes).unwrap();
        assert_eq!(pcm.sample_rate(), 8000);
        assert_eq!(pcm.channels(), 2);
        assert_eq!(pcm.frame_count(), 4000);
        assert!((pcm.duration() - 0.5).abs() < 1e-9);
        assert!(pcm.samples().iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = SymphoniaDecoder::with_extension_hint("mp3").decode(b"definitely not audio data");
        match result {
            Err(crate::error::CompositorError::Audio(AudioError::Decode { .. })) => {}
            other => panic!("Expected Decode error, got {:?}", other.map(|p| p.duration())),
        }
    }

    #[test]
    fn test_empty_input_is_decode_error() {
        assert!(SymphoniaDecoder::new().decode(&[]).is_err());
    }

    #[test]
    fn test_format_support() {
        assert!(SymphoniaDecoder::is_format_supported("wav"));
        assert!(SymphoniaDecoder::is_format_supported("FLAC"));
        assert!(!SymphoniaDecoder::is_format_supported("xyz"));
    }

    #[test]
    fn test_int_to_float_conversion() {
        assert_eq!(SymphoniaDecoder::int_to_float(0, 16), 0.0);
        assert_eq!(SymphoniaDecoder::int_to_float(-32768, 16), -1.0);
        assert_eq!(SymphoniaDecoder::int_to_float(128, 8), 0.0);
        assert_eq!(SymphoniaDecoder::int_to_float(0, 8), -1.0);
    }
}
