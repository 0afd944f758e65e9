//! bpmtag - Batch BPM detection and tag writing for DJ libraries
//!
//! A command-line utility that estimates the tempo of every audio file in a
//! directory and writes it into the file's `BPM` tag, plus an importer that
//! copies BPM, key and other fields from a Mixxx library database.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `discovery`: File scanning and access checks
//! - `audio`: Decoding to a normalized WAV and hop-sized block reading
//! - `analysis`: Window policy, beat tracking and median BPM reduction
//! - `tags`: Case-insensitive tag merging over a swappable tag store
//! - `pipeline`: Batch orchestration, worker threads, cancellation, progress
//! - `import`: Mixxx library reader and tag importer
//! - `export`: JSON run reports
//!
//! # Example
//!
//! ```no_run
//! use bpmtag::config::TagSettings;
//! use bpmtag::pipeline::{BatchJob, CancellationToken};
//!
//! let settings = TagSettings::default();
//! let job = BatchJob::from_settings(&settings, CancellationToken::new())?;
//! let summary = job.process_directory(&settings.input)?;
//! println!("Tagged {} of {} files", summary.succeeded, summary.total);
//! # Ok::<(), bpmtag::BpmTagError>(())
//! ```

pub mod analysis;
pub mod audio;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod import;
pub mod pipeline;
pub mod tags;
pub mod types;

// Re-export key types at crate root
pub use error::{BpmTagError, FailureKind, FileOutcome, Result};
pub use types::{AnalysisTask, BeatTimestamps, BpmEstimate, TagSet, TagValue, WindowSizes};
