//! Conversion of source audio into a normalized WAV for analysis
//!
//! The built-in transcoder decodes with symphonia and writes mono 32-bit
//! float WAV with hound. The ffmpeg transcoder shells out to an external
//! binary for codecs symphonia cannot read.

use super::decoder::{self, SampleSink, StreamInfo};
use crate::error::{BpmTagError, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Decode service: converts `source` into a WAV file at `dest`
pub trait Transcoder: Send + Sync {
    fn transcode(&self, source: &Path, dest: &Path) -> Result<()>;

    /// Get the name of this transcoder (for logging)
    fn name(&self) -> &'static str;
}

/// Built-in decoder (symphonia → hound)
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaTranscoder;

impl Transcoder for SymphoniaTranscoder {
    fn transcode(&self, source: &Path, dest: &Path) -> Result<()> {
        let mut sink = WavSink {
            source,
            dest,
            writer: None,
        };
        decoder::decode_mono(source, &mut sink)?;

        match sink.writer.take() {
            Some(writer) => writer.finalize().map_err(|e| sink.write_error(e))?,
            None => return Err(BpmTagError::decode_error(source, "Decoder produced no stream")),
        }

        debug!("Converted {} to WAV", source.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "symphonia"
    }
}

/// Writes decoded samples as mono float WAV
struct WavSink<'a> {
    source: &'a Path,
    dest: &'a Path,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
}

impl WavSink<'_> {
    fn write_error(&self, e: hound::Error) -> BpmTagError {
        BpmTagError::decode_error(
            self.source,
            format!("Failed to write {}: {}", self.dest.display(), e),
        )
    }
}

impl SampleSink for WavSink<'_> {
    fn start(&mut self, info: StreamInfo) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: info.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::create(self.dest, spec).map_err(|e| self.write_error(e))?;
        self.writer = Some(writer);
        Ok(())
    }

    fn write(&mut self, samples: &[f32]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        let mut failure = None;
        for &sample in samples {
            if let Err(e) = writer.write_sample(sample) {
                failure = Some(e);
                break;
            }
        }
        match failure {
            Some(e) => Err(self.write_error(e)),
            None => Ok(()),
        }
    }
}

/// External ffmpeg binary
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Verify the binary runs; meant to be called once before a job starts
    pub fn check_available(&self) -> Result<()> {
        let missing = |reason: String| BpmTagError::MissingDependency {
            name: "ffmpeg".to_string(),
            reason,
        };

        let status = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| missing(format!("cannot run {}: {}", self.binary.display(), e)))?;

        if !status.success() {
            return Err(missing(format!(
                "{} -version exited with {}",
                self.binary.display(),
                status
            )));
        }

        info!("Using ffmpeg at {}", self.binary.display());
        Ok(())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, source: &Path, dest: &Path) -> Result<()> {
        let output = Command::new(&self.binary)
            .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"])
            .arg(source)
            .args(["-vn", "-acodec", "pcm_s16le"])
            .arg(dest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                BpmTagError::decode_error(
                    source,
                    format!("Failed to run {}: {}", self.binary.display(), e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("no output").trim().to_string();
            return Err(BpmTagError::decode_error(
                source,
                format!("ffmpeg exited with {}: {}", output.status, detail),
            ));
        }

        debug!("Converted {} to WAV with ffmpeg", source.display());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
