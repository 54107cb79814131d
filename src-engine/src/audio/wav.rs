//! Canonical WAV container encoding.
//!
//! The engine hands PCM samples to the inference module directly, but any
//! audio staged to disk (or into the module's virtual filesystem) uses
//! this fixed-layout container so downstream consumers can rely on byte
//! offsets: a 44-byte RIFF/WAVE header, then interleaved little-endian
//! samples.
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0      | "RIFF" |
//! | 4      | file size - 8 (u32 LE) |
//! | 8      | "WAVE" |
//! | 12     | "fmt " |
//! | 16     | fmt chunk size = 16 (u32 LE) |
//! | 20     | format tag: 1 = PCM, 3 = IEEE float (u16 LE) |
//! | 22     | channel count (u16 LE) |
//! | 24     | sample rate (u32 LE) |
//! | 28     | byte rate (u32 LE) |
//! | 32     | block align (u16 LE) |
//! | 34     | bits per sample (u16 LE) |
//! | 36     | "data" |
//! | 40     | data size (u32 LE) |
//! | 44     | samples |

use super::AudioBuffer;

/// On-disk sample representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavSampleFormat {
    /// 16-bit signed integer PCM (format tag 1)
    Int16,
    /// 32-bit IEEE float (format tag 3)
    Float32,
}

impl WavSampleFormat {
    fn format_tag(self) -> u16 {
        match self {
            WavSampleFormat::Int16 => 1,
            WavSampleFormat::Float32 => 3,
        }
    }

    fn bytes_per_sample(self) -> u32 {
        match self {
            WavSampleFormat::Int16 => 2,
            WavSampleFormat::Float32 => 4,
        }
    }
}

/// Serialize an [`AudioBuffer`] into a canonical WAV container.
///
/// Every sample is clamped to [-1, 1] before quantization. The returned
/// buffer is complete and immutable; fields live at the offsets in the
/// module table above.
pub fn encode_wav(buf: &AudioBuffer, format: WavSampleFormat) -> Vec<u8> {
    let bytes_per_sample = format.bytes_per_sample();
    let bits_per_sample = (bytes_per_sample * 8) as u16;
    let channels = buf.channels.max(1);
    let byte_rate = buf.sample_rate * channels as u32 * bytes_per_sample;
    let block_align = channels * bytes_per_sample as u16;
    let data_size = buf.samples.len() as u32 * bytes_per_sample;

    let mut out = Vec::with_capacity(44 + data_size as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&format.format_tag().to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&buf.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());

    match format {
        WavSampleFormat::Int16 => {
            for &sample in &buf.samples {
                let clamped = sample.clamp(-1.0, 1.0);
                let quantized = (clamped * 32767.0).round() as i16;
                out.extend_from_slice(&quantized.to_le_bytes());
            }
        }
        WavSampleFormat::Float32 => {
            for &sample in &buf.samples {
                out.extend_from_slice(&sample.clamp(-1.0, 1.0).to_le_bytes());
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_buffer() -> AudioBuffer {
        AudioBuffer {
            samples: vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25],
            sample_rate: 16000,
            channels: 1,
        }
    }

    #[test]
    fn test_header_magic_at_fixed_offsets() {
        let wav = encode_wav(&sample_buffer(), WavSampleFormat::Int16);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
    }

    #[test]
    fn test_header_fields_int16() {
        let wav = encode_wav(&sample_buffer(), WavSampleFormat::Int16);
        // fmt chunk size
        assert_eq!(u32::from_le_bytes(wav[16..20].try_into().unwrap()), 16);
        // PCM format tag
        assert_eq!(u16::from_le_bytes(wav[20..22].try_into().unwrap()), 1);
        // channels
        assert_eq!(u16::from_le_bytes(wav[22..24].try_into().unwrap()), 1);
        // sample rate
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 16000);
        // byte rate = rate * channels * 2
        assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 32000);
        // block align
        assert_eq!(u16::from_le_bytes(wav[32..34].try_into().unwrap()), 2);
        // bit depth
        assert_eq!(u16::from_le_bytes(wav[34..36].try_into().unwrap()), 16);
    }

    #[test]
    fn test_data_chunk_size_matches_sample_count() {
        let buf = sample_buffer();
        let wav = encode_wav(&buf, WavSampleFormat::Int16);
        let data_size = u32::from_le_bytes(wav[40..44].try_into().unwrap());
        assert_eq!(data_size as usize, buf.samples.len() * 2);
        assert_eq!(wav.len(), 44 + data_size as usize);

        let riff_size = u32::from_le_bytes(wav[4..8].try_into().unwrap());
        assert_eq!(riff_size as usize, wav.len() - 8);
    }

    #[test]
    fn test_float_format_tag_and_width() {
        let buf = sample_buffer();
        let wav = encode_wav(&buf, WavSampleFormat::Float32);
        assert_eq!(u16::from_le_bytes(wav[20..22].try_into().unwrap()), 3);
        assert_eq!(u16::from_le_bytes(wav[34..36].try_into().unwrap()), 32);
        let data_size = u32::from_le_bytes(wav[40..44].try_into().unwrap());
        assert_eq!(data_size as usize, buf.samples.len() * 4);
    }

    #[test]
    fn test_quantization_clamps_out_of_range() {
        let buf = AudioBuffer {
            samples: vec![2.0, -3.0],
            sample_rate: 16000,
            channels: 1,
        };
        let wav = encode_wav(&buf, WavSampleFormat::Int16);
        let first = i16::from_le_bytes(wav[44..46].try_into().unwrap());
        let second = i16::from_le_bytes(wav[46..48].try_into().unwrap());
        assert_eq!(first, 32767);
        assert_eq!(second, -32767);
    }

    #[test]
    fn test_stereo_block_align() {
        let buf = AudioBuffer {
            samples: vec![0.0; 8],
            sample_rate: 44100,
            channels: 2,
        };
        let wav = encode_wav(&buf, WavSampleFormat::Int16);
        assert_eq!(u16::from_le_bytes(wav[22..24].try_into().unwrap()), 2);
        assert_eq!(u16::from_le_bytes(wav[32..34].try_into().unwrap()), 4);
        assert_eq!(
            u32::from_le_bytes(wav[28..32].try_into().unwrap()),
            44100 * 2 * 2
        );
    }
}
