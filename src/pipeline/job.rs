//! Background jobs
//!
//! Each job runs on exactly one worker thread. The caller keeps the
//! `JobHandle`, drains progress events on its own thread, and may cancel.

use super::cancel::CancellationToken;
use super::orchestrator::BatchJob;
use super::progress::{ProgressEvent, ProgressReporter};
use super::summary::BatchSummary;
use crate::error::{BpmTagError, Result};
use crate::import::{ImportJob, ImportSummary};
use crossbeam_channel::{unbounded, Receiver};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// A running job
pub struct JobHandle<T> {
    events: Receiver<ProgressEvent>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<T>>,
}

impl<T> JobHandle<T> {
    /// Progress events; the channel disconnects when the worker exits
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ask the worker to stop before its next file or page
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return its result
    pub fn join(self) -> Result<T> {
        match self.handle.join() {
            Ok(result) => {
                debug!("Worker thread completed");
                result
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                error!("Worker thread panicked: {}", panic_msg);
                Err(BpmTagError::WorkerPanic(panic_msg))
            }
        }
    }
}

fn spawn<T, F>(name: &str, cancel: CancellationToken, work: F) -> Result<JobHandle<T>>
where
    T: Send + 'static,
    F: FnOnce(ProgressReporter) -> Result<T> + Send + 'static,
{
    let (tx, events) = unbounded();
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || work(ProgressReporter::new(tx)))?;

    Ok(JobHandle {
        events,
        cancel,
        handle,
    })
}

/// Run a tagging job over `root` on a worker thread
pub fn spawn_tag_job(job: BatchJob, root: PathBuf) -> Result<JobHandle<BatchSummary>> {
    let cancel = job.cancel_token();
    spawn("bpmtag-tag", cancel, move |progress| {
        job.with_progress(progress).process_directory(&root)
    })
}

/// Run a library import on a worker thread
pub fn spawn_import_job(job: ImportJob) -> Result<JobHandle<ImportSummary>> {
    let cancel = job.cancel_token();
    spawn("bpmtag-import", cancel, move |progress| {
        job.with_progress(progress).run()
    })
}
