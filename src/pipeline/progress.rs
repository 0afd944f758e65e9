//! Progress notifications from a worker to the thread owning the terminal

use crate::error::FileOutcome;
use crossbeam_channel::Sender;
use std::path::PathBuf;
use tracing::trace;

/// One progress notification
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Work is about to start; `total` files or records
    Started { total: usize },
    /// A file finished; `index` counts from 1
    FileDone {
        index: usize,
        total: usize,
        path: PathBuf,
        outcome: FileOutcome,
    },
    /// An importer page finished
    PageDone { processed: usize, total: usize },
    /// The job stopped, normally or through cancellation
    Finished { cancelled: bool },
}

/// Sending half of the progress channel; a no-op when detached
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<Sender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new(tx: Sender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A reporter that drops every event
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is watching; keep working
            if tx.send(event).is_err() {
                trace!("Progress receiver dropped");
            }
        }
    }
}
