//! Job orchestration: batch tagging, worker threads, cancellation, progress

pub mod cancel;
pub mod job;
pub mod orchestrator;
pub mod progress;
pub mod summary;

pub use cancel::CancellationToken;
pub use job::{spawn_import_job, spawn_tag_job, JobHandle};
pub use orchestrator::{plan_dry_run, BatchJob, DryRunPlan, BPM_TAG};
pub use progress::{ProgressEvent, ProgressReporter};
pub use summary::{BatchSummary, FailedFile, TaggedTrack};
