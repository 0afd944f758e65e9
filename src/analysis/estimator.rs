//! Per-file tempo estimation
//!
//! Normalizes the source into a scratch WAV, streams it through a tempo
//! tracker one hop at a time and reduces the collected beats to a median BPM.

use super::reduce::median_bpm;
use super::traits::TrackerFactory;
use super::windowing::window_sizes;
use crate::audio::{HopReader, ScratchFile, Transcoder};
use crate::error::{BpmTagError, Result};
use crate::types::{AnalysisTask, BeatTimestamps, BpmEstimate};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// Estimates one BPM per audio file
#[derive(Clone)]
pub struct TempoEstimator {
    transcoder: Arc<dyn Transcoder>,
    trackers: Arc<dyn TrackerFactory>,
}

impl TempoEstimator {
    pub fn new(transcoder: Arc<dyn Transcoder>, trackers: Arc<dyn TrackerFactory>) -> Self {
        Self {
            transcoder,
            trackers,
        }
    }

    /// Name of the decoder and tracker pair, for logging
    pub fn describe(&self) -> String {
        format!("{} + {}", self.transcoder.name(), self.trackers.name())
    }

    /// Estimate the tempo of `source`, using `scratch` for decoded audio
    ///
    /// The scratch file is left for its guard to delete; the reader over it
    /// is closed before this returns, on success or failure.
    pub fn estimate(&self, source: &Path, scratch: &ScratchFile) -> Result<BpmEstimate> {
        self.transcoder
            .transcode(source, scratch.path())
            .map_err(|e| match e {
                BpmTagError::DecodeError { .. } => e.for_file(source),
                other => BpmTagError::decode_error(source, other.to_string()),
            })?;

        // Stream errors name the scratch file; report them against the source
        let beats = self.track(scratch.path()).map_err(|e| match e {
            BpmTagError::DetectorError { reason, .. } => BpmTagError::detector_error(source, reason),
            other => other.for_file(source),
        })?;
        debug!("{}: {} beats", source.display(), beats.len());

        median_bpm(beats.as_slice()).ok_or_else(|| BpmTagError::NoBeatsDetected {
            path: source.to_path_buf(),
            beats: beats.len(),
        })
    }

    /// Run the tracker over the normalized file and collect beat timestamps
    fn track(&self, decoded: &Path) -> Result<BeatTimestamps> {
        let sample_rate = HopReader::probe_sample_rate(decoded)?;
        let sizes = window_sizes(sample_rate, AnalysisTask::Beat);
        trace!(
            "Tracking at {} Hz, window {}, hop {}",
            sample_rate,
            sizes.window,
            sizes.hop
        );

        let mut reader = HopReader::open(decoded, sizes.hop)?;
        let mut tracker = self.trackers.create(sizes, sample_rate)?;
        let mut beats = BeatTimestamps::default();

        loop {
            let (block, read) = reader.read_block()?;
            if let Some(time) = tracker.process(block)? {
                if !beats.push(time) {
                    trace!("Dropped out-of-order beat at {:.3}s", time);
                }
            }
            if read < reader.hop() {
                break;
            }
        }

        Ok(beats)
    }
}
