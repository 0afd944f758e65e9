//! Per-run results

use crate::error::{FailureKind, FileOutcome};
use crate::types::BpmEstimate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file whose BPM was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedTrack {
    pub path: PathBuf,
    pub bpm: BpmEstimate,
}

/// A file that could not be processed, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub reason: String,
}

/// Result of a tagging run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Candidates found by the scan
    pub total: usize,
    /// Files attempted before the run ended
    pub processed: usize,
    pub succeeded: usize,
    pub tagged: Vec<TaggedTrack>,
    pub failed: Vec<FailedFile>,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Fold one file's outcome into the summary
    pub fn record(&mut self, path: &Path, outcome: &FileOutcome) {
        self.processed += 1;
        match outcome.failure() {
            None => {
                self.succeeded += 1;
                if let Some(bpm) = outcome.bpm() {
                    self.tagged.push(TaggedTrack {
                        path: path.to_path_buf(),
                        bpm,
                    });
                }
            }
            Some((kind, reason)) => self.failed.push(FailedFile {
                path: path.to_path_buf(),
                kind,
                reason,
            }),
        }
    }

    /// Files never attempted because the run was cancelled
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed)
    }

    /// True when every candidate was tagged
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}
