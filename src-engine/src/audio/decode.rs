//! Compressed container decoding via symphonia.

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::AudioBuffer;
use crate::error::EngineError;

/// Decode audio bytes into interleaved f32 PCM at the source rate.
///
/// Supports WAV, MP3, OGG, FLAC, and M4A/AAC containers. The optional
/// `extension_hint` (file extension, lowercase) speeds up probing but is
/// not required. Unparseable input fails with [`EngineError::AudioDecode`].
pub fn decode(bytes: &[u8], extension_hint: Option<&str>) -> Result<AudioBuffer, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::AudioDecode("input is empty".into()));
    }

    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| EngineError::AudioDecode(format!("unrecognized container: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| EngineError::AudioDecode("no audio track found".into()))?;

    let codec_params = track.codec_params.clone();
    let track_id = track.id;
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| EngineError::AudioDecode("source sample rate unknown".into()))?;
    let channels = codec_params.channels.map_or(1, |c| c.count()) as u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| EngineError::AudioDecode(format!("codec init failed: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(EngineError::AudioDecode(format!("packet read: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| EngineError::AudioDecode(format!("decode: {}", e)))?;

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if samples.is_empty() {
        return Err(EngineError::AudioDecode("no audio samples decoded".into()));
    }

    tracing::debug!(
        "decoded {} samples ({} ch @ {} Hz)",
        samples.len(),
        channels,
        sample_rate
    );

    Ok(AudioBuffer {
        samples,
        sample_rate,
        channels,
    })
}
