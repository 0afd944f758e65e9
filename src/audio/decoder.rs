//! Audio decoding using symphonia
//!
//! Decodes audio files to mono f32 samples at their native sample rate,
//! streaming packet by packet so whole tracks never sit in memory.

use crate::error::{BpmTagError, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Maximum file size we'll attempt to decode (2GB)
const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Stream format discovered when decoding starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: usize,
}

/// Receiver of decoded mono samples
pub trait SampleSink {
    /// Called once with the stream format, before any samples
    fn start(&mut self, info: StreamInfo) -> Result<()>;

    fn write(&mut self, samples: &[f32]) -> Result<()>;
}

/// Decode an audio file, handing mono sample chunks to `sink`
///
/// Returns the total number of mono samples decoded.
pub fn decode_mono<K: SampleSink>(path: &Path, sink: &mut K) -> Result<u64> {
    // Check file size before attempting to decode
    let metadata = std::fs::metadata(path).map_err(|e| {
        BpmTagError::decode_error(path, format!("Failed to read file metadata: {}", e))
    })?;

    if metadata.len() > MAX_FILE_SIZE {
        return Err(BpmTagError::decode_error(
            path,
            format!(
                "File too large ({:.1} GB). Maximum supported size is 2 GB.",
                metadata.len() as f64 / (1024.0 * 1024.0 * 1024.0)
            ),
        ));
    }

    let file = std::fs::File::open(path)
        .map_err(|e| BpmTagError::decode_error(path, format!("Failed to open file: {}", e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Provide a hint based on file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| BpmTagError::decode_error(path, format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| BpmTagError::decode_error(path, "No audio tracks found"))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| BpmTagError::decode_error(path, "Stream does not declare a sample rate"))?;
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    debug!(
        "Decoding: {} @ {}Hz, {} channels",
        path.display(),
        sample_rate,
        channels
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| {
            BpmTagError::decode_error(path, format!("Failed to create decoder: {}", e))
        })?;

    sink.start(StreamInfo {
        sample_rate,
        channels,
    })?;

    let mut total: u64 = 0;
    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(symphonia::core::errors::Error::ResetRequired) => break,
            Err(e) => {
                return Err(BpmTagError::decode_error(
                    path,
                    format!("Failed to read packet: {}", e),
                ));
            }
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // Skip corrupted frames
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(BpmTagError::decode_error(path, format!("Decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        if num_frames == 0 {
            continue;
        }

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        to_mono_into(sample_buf.samples(), spec.channels.count(), &mut mono);
        total += mono.len() as u64;
        sink.write(&mono)?;
    }

    debug!(
        "Decoded {} samples ({:.2}s) from {}",
        total,
        total as f64 / sample_rate as f64,
        path.display()
    );

    Ok(total)
}

/// Convert interleaved multi-channel audio to mono, reusing `out`
fn to_mono_into(samples: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    if channels <= 1 {
        out.extend_from_slice(samples);
        return;
    }

    out.extend(
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}
