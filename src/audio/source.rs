//! Fixed-granularity reading of a normalized WAV file
//!
//! Mirrors a streaming audio source: every read returns a block of exactly
//! `hop` mono samples (zero-padded at the end) and the number of samples
//! actually read. A count below `hop` marks the end of the stream.

use crate::error::{BpmTagError, Result};
use hound::{SampleFormat, WavReader};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Streaming hop-sized reader over a WAV file
pub struct HopReader {
    reader: WavReader<BufReader<File>>,
    path: PathBuf,
    hop: usize,
    channels: usize,
    format: SampleFormat,
    /// Divisor mapping integer samples to [-1.0, 1.0)
    scale: f32,
    block: Vec<f32>,
    interleaved: Vec<f32>,
    finished: bool,
}

impl HopReader {
    /// Read only the header to discover the file's sample rate
    pub fn probe_sample_rate(path: &Path) -> Result<u32> {
        let reader = WavReader::open(path).map_err(|e| {
            BpmTagError::detector_error(path, format!("Cannot open decoded audio: {}", e))
        })?;
        Ok(reader.spec().sample_rate)
    }

    /// Open `path` for reading in blocks of `hop` samples
    pub fn open(path: &Path, hop: usize) -> Result<Self> {
        if hop == 0 {
            return Err(BpmTagError::detector_error(path, "Hop size must be positive"));
        }

        let reader = WavReader::open(path).map_err(|e| {
            BpmTagError::detector_error(path, format!("Cannot open decoded audio: {}", e))
        })?;
        let spec = reader.spec();

        if spec.channels == 0 {
            return Err(BpmTagError::detector_error(path, "Decoded audio has no channels"));
        }

        let scale = match spec.sample_format {
            SampleFormat::Float => 1.0,
            SampleFormat::Int => (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32,
        };

        Ok(Self {
            reader,
            path: path.to_path_buf(),
            hop,
            channels: spec.channels as usize,
            format: spec.sample_format,
            scale,
            block: vec![0.0; hop],
            interleaved: Vec::with_capacity(hop * spec.channels as usize),
            finished: false,
        })
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Read the next block
    ///
    /// Returns the hop-sized block and the count of samples actually read.
    pub fn read_block(&mut self) -> Result<(&[f32], usize)> {
        self.interleaved.clear();
        let wanted = self.hop * self.channels;

        if !self.finished {
            match self.format {
                SampleFormat::Float => {
                    for sample in self.reader.samples::<f32>().take(wanted) {
                        let sample = sample.map_err(|e| {
                            BpmTagError::detector_error(&self.path, format!("Read failed: {}", e))
                        })?;
                        self.interleaved.push(sample);
                    }
                }
                SampleFormat::Int => {
                    for sample in self.reader.samples::<i32>().take(wanted) {
                        let sample = sample.map_err(|e| {
                            BpmTagError::detector_error(&self.path, format!("Read failed: {}", e))
                        })?;
                        self.interleaved.push(sample as f32 / self.scale);
                    }
                }
            }
        }

        let read = self.interleaved.len() / self.channels;
        if read < self.hop {
            self.finished = true;
        }

        self.block.fill(0.0);
        for (slot, frame) in self
            .block
            .iter_mut()
            .zip(self.interleaved.chunks_exact(self.channels))
        {
            *slot = frame.iter().sum::<f32>() / self.channels as f32;
        }

        Ok((&self.block[..], read))
    }
}
