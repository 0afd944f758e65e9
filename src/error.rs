//! Unified error types for bpmtag
//!
//! Error strategy:
//! - Per-file errors (decode, detection, tagging, vanished files): recoverable,
//!   recorded against the file and the batch continues
//! - Startup and system errors (missing decoder, unreadable database): fatal
//!
//! All errors include actionable suggestions where possible.

use crate::types::BpmEstimate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Tag formats lofty can write, for helpful error messages
pub const TAGGABLE_FORMATS: &str = "MP3, FLAC, WAV, AIFF, OGG, M4A";

/// Top-level error type for bpmtag operations
#[derive(Debug, Error)]
pub enum BpmTagError {
    // =========================================================================
    // Recoverable errors - record against the file, continue batch
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}\n  Tip: If the file plays in other apps, try --ffmpeg to decode it with an external ffmpeg")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Beat detection failed for '{path}': {reason}")]
    DetectorError { path: PathBuf, reason: String },

    #[error("No beats detected in '{path}' ({beats} beat(s) found, at least 2 required)")]
    NoBeatsDetected { path: PathBuf, beats: usize },

    #[error("Cannot write tags to '{path}': {reason}\n  Taggable formats: {TAGGABLE_FORMATS}\n  Tip: Check the file is not open in another application and is writable")]
    TagWriteError { path: PathBuf, reason: String },

    #[error("File unavailable: '{path}': {reason}\n  Tip: The file may have been moved, or its drive ejected, after the scan")]
    PathUnavailable { path: PathBuf, reason: String },

    // =========================================================================
    // Fatal errors - abort before or during the run
    // =========================================================================
    #[error("Unknown analysis task '{0}' (expected one of: pitch, onset, beat, mfcc)")]
    UnknownTask(String),

    #[error("Missing dependency '{name}': {reason}\n  Tip: Install it, pass its full path, or drop the option to use the built-in decoder")]
    MissingDependency { name: String, reason: String },

    #[error("Cannot read Mixxx library '{path}': {reason}\n  Tip: Close Mixxx or copy mixxxdb.sqlite elsewhere and pass the copy")]
    DatabaseError { path: PathBuf, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Worker thread panicked: {0}")]
    WorkerPanic(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for bpmtag operations
pub type Result<T> = std::result::Result<T, BpmTagError>;

impl BpmTagError {
    /// Returns true if this error is recoverable (record it, continue batch)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BpmTagError::DecodeError { .. }
                | BpmTagError::DetectorError { .. }
                | BpmTagError::NoBeatsDetected { .. }
                | BpmTagError::TagWriteError { .. }
                | BpmTagError::PathUnavailable { .. }
        )
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BpmTagError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a detector error with context about the issue
    pub fn detector_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BpmTagError::DetectorError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a tag write error from any displayable cause
    pub fn tag_write_error(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        BpmTagError::TagWriteError {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a path-unavailable error, explaining common io failures
    pub fn path_unavailable(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let reason = match err.kind() {
            std::io::ErrorKind::NotFound => "file no longer exists".to_string(),
            std::io::ErrorKind::PermissionDenied => {
                "permission denied (file must be readable and writable)".to_string()
            }
            _ => err.to_string(),
        };
        BpmTagError::PathUnavailable {
            path: path.into(),
            reason,
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        BpmTagError::OutputError { path, reason }
    }

    /// Replace an empty path (errors raised below the file boundary) with `path`
    pub fn for_file(self, path: &Path) -> Self {
        let fill = |p: PathBuf| if p.as_os_str().is_empty() { path.to_path_buf() } else { p };
        match self {
            BpmTagError::DecodeError { path: p, reason } => BpmTagError::DecodeError { path: fill(p), reason },
            BpmTagError::DetectorError { path: p, reason } => BpmTagError::DetectorError { path: fill(p), reason },
            BpmTagError::NoBeatsDetected { path: p, beats } => BpmTagError::NoBeatsDetected { path: fill(p), beats },
            BpmTagError::TagWriteError { path: p, reason } => BpmTagError::TagWriteError { path: fill(p), reason },
            BpmTagError::PathUnavailable { path: p, reason } => BpmTagError::PathUnavailable { path: fill(p), reason },
            other => other,
        }
    }
}

/// Extension trait for adding file context to foreign errors
pub trait ErrorContext<T> {
    /// Treat the error as a tag write failure on `path`
    fn tag_context(self, path: &Path) -> Result<T>;
}

impl<T, E: fmt::Display> ErrorContext<T> for std::result::Result<T, E> {
    fn tag_context(self, path: &Path) -> Result<T> {
        self.map_err(|e| BpmTagError::tag_write_error(path, e))
    }
}

// =============================================================================
// Per-file outcomes
// =============================================================================

/// Outcome of processing a single file in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// BPM estimated and written to the file's tags
    Success { bpm: BpmEstimate },
    DecodeError { reason: String },
    DetectorError { reason: String },
    NoBeats { beats: usize },
    TagWriteError { reason: String },
    PathUnavailable { reason: String },
}

/// Failure category, for summaries and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Decode,
    Detector,
    NoBeats,
    TagWrite,
    PathUnavailable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Decode => "decode error",
            FailureKind::Detector => "detector error",
            FailureKind::NoBeats => "no beats detected",
            FailureKind::TagWrite => "tag write error",
            FailureKind::PathUnavailable => "file unavailable",
        };
        f.write_str(label)
    }
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Success { .. })
    }

    /// The estimated BPM, for successful outcomes
    pub fn bpm(&self) -> Option<BpmEstimate> {
        match self {
            FileOutcome::Success { bpm } => Some(*bpm),
            _ => None,
        }
    }

    /// Failure category and human-readable reason, for failed outcomes
    pub fn failure(&self) -> Option<(FailureKind, String)> {
        match self {
            FileOutcome::Success { .. } => None,
            FileOutcome::DecodeError { reason } => Some((FailureKind::Decode, reason.clone())),
            FileOutcome::DetectorError { reason } => Some((FailureKind::Detector, reason.clone())),
            FileOutcome::NoBeats { beats } => Some((
                FailureKind::NoBeats,
                format!("{} beat(s) found, at least 2 required", beats),
            )),
            FileOutcome::TagWriteError { reason } => Some((FailureKind::TagWrite, reason.clone())),
            FileOutcome::PathUnavailable { reason } => {
                Some((FailureKind::PathUnavailable, reason.clone()))
            }
        }
    }

    /// Convert a per-file error into an outcome
    ///
    /// Returns the error back if it is not a per-file error.
    pub fn from_error(err: BpmTagError) -> std::result::Result<Self, BpmTagError> {
        match err {
            BpmTagError::DecodeError { reason, .. } => Ok(FileOutcome::DecodeError { reason }),
            BpmTagError::DetectorError { reason, .. } => Ok(FileOutcome::DetectorError { reason }),
            BpmTagError::NoBeatsDetected { beats, .. } => Ok(FileOutcome::NoBeats { beats }),
            BpmTagError::TagWriteError { reason, .. } => Ok(FileOutcome::TagWriteError { reason }),
            BpmTagError::PathUnavailable { reason, .. } => Ok(FileOutcome::PathUnavailable { reason }),
            other => Err(other),
        }
    }
}
