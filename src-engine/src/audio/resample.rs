//! Sample-rate conversion and channel downmix.
//!
//! The resampler is a plain linear interpolator: output sample `i` reads
//! source position `i / ratio` and blends the two neighbouring source
//! samples by the fractional distance. Adequate for speech input and free
//! of windowing state, so buffers of any length resample in one pass.

use super::{AudioBuffer, TARGET_SAMPLE_RATE};

/// Downmix interleaved audio by channel truncation.
///
/// Only the first `target_channels` channels of each frame are copied;
/// the remaining channels are discarded (no averaging).
pub fn downmix(buf: &AudioBuffer, target_channels: u16) -> AudioBuffer {
    if buf.channels <= target_channels || buf.channels == 0 {
        return buf.clone();
    }

    let src_ch = buf.channels as usize;
    let dst_ch = target_channels as usize;
    let frames = buf.frame_count();
    let mut samples = Vec::with_capacity(frames * dst_ch);
    for frame in 0..frames {
        let base = frame * src_ch;
        samples.extend_from_slice(&buf.samples[base..base + dst_ch]);
    }

    AudioBuffer {
        samples,
        sample_rate: buf.sample_rate,
        channels: target_channels,
    }
}

/// Resample mono audio to `target_rate` using linear interpolation.
///
/// Target length is `round(len * target_rate / source_rate)`, which keeps
/// the duration within one sample period of the source.
pub fn resample(buf: &AudioBuffer, target_rate: u32) -> AudioBuffer {
    debug_assert_eq!(buf.channels, 1, "resample expects mono input");

    if buf.sample_rate == target_rate || buf.samples.is_empty() {
        let mut out = buf.clone();
        out.sample_rate = target_rate;
        return out;
    }

    let ratio = target_rate as f64 / buf.sample_rate as f64;
    let src = &buf.samples;
    let target_len = (src.len() as f64 * ratio).round() as usize;

    let mut samples = Vec::with_capacity(target_len);
    for i in 0..target_len {
        let pos = i as f64 / ratio;
        let i0 = pos.floor() as usize;
        let i1 = (i0 + 1).min(src.len() - 1);
        let frac = (pos - i0 as f64) as f32;
        let i0 = i0.min(src.len() - 1);
        samples.push(src[i0] * (1.0 - frac) + src[i1] * frac);
    }

    AudioBuffer {
        samples,
        sample_rate: target_rate,
        channels: 1,
    }
}

/// Convert arbitrary decoded audio to the module's format: mono, 16kHz.
pub fn to_mono_16k(buf: &AudioBuffer) -> AudioBuffer {
    let mono = downmix(buf, 1);
    resample(&mono, TARGET_SAMPLE_RATE)
}
