//! Batch orchestration
//!
//! Enumerates candidate files, then estimates and tags them one at a time.
//! Per-file failures become `FileOutcome`s at the file boundary and never
//! stop the batch; cancellation is observed between files.

use super::cancel::CancellationToken;
use super::progress::{ProgressEvent, ProgressReporter};
use super::summary::BatchSummary;
use crate::analysis::{SpectralFluxFactory, TempoEstimator};
use crate::audio::{FfmpegTranscoder, ScratchSpace, SymphoniaTranscoder, Transcoder};
use crate::config::TagSettings;
use crate::discovery::{self, ScanOptions};
use crate::error::{FileOutcome, Result};
use crate::tags::{merge_tags, LoftyTagStore, TagStore};
use crate::types::TagValue;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Tag key the estimated tempo is written under
pub const BPM_TAG: &str = "BPM";

/// One tagging run over a directory
pub struct BatchJob {
    estimator: TempoEstimator,
    store: Arc<dyn TagStore>,
    scratch: ScratchSpace,
    options: ScanOptions,
    cancel: CancellationToken,
    progress: ProgressReporter,
}

impl BatchJob {
    pub fn new(
        estimator: TempoEstimator,
        store: Arc<dyn TagStore>,
        scratch: ScratchSpace,
        options: ScanOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            estimator,
            store,
            scratch,
            options,
            cancel,
            progress: ProgressReporter::detached(),
        }
    }

    /// Build the production job for `settings`
    ///
    /// Fails with `MissingDependency` when an external ffmpeg was requested
    /// but cannot be run, before any file is touched.
    pub fn from_settings(settings: &TagSettings, cancel: CancellationToken) -> Result<Self> {
        let transcoder: Arc<dyn Transcoder> = match &settings.ffmpeg {
            Some(binary) => {
                let ffmpeg = FfmpegTranscoder::new(binary);
                ffmpeg.check_available()?;
                Arc::new(ffmpeg)
            }
            None => Arc::new(SymphoniaTranscoder),
        };

        let estimator = TempoEstimator::new(transcoder, Arc::new(SpectralFluxFactory::default()));
        let scratch = ScratchSpace::new(settings.scratch_dir.as_deref())?;

        Ok(Self::new(
            estimator,
            Arc::new(LoftyTagStore::new()),
            scratch,
            scan_options(settings),
            cancel,
        ))
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process every candidate under `root`
    pub fn process_directory(&self, root: &Path) -> Result<BatchSummary> {
        let start = Instant::now();
        info!("Scanning {} for audio files...", root.display());
        let files = discovery::scan(root, &self.options)?;
        let summary = self.process_files(&files)?;

        info!(
            "Tagged {} of {} files in {:.2}s ({} failed{})",
            summary.succeeded,
            summary.total,
            start.elapsed().as_secs_f64(),
            summary.failed.len(),
            if summary.cancelled { ", cancelled" } else { "" }
        );
        Ok(summary)
    }

    /// Process `files` in order
    pub fn process_files(&self, files: &[PathBuf]) -> Result<BatchSummary> {
        let total = files.len();
        let mut summary = BatchSummary::new(total);
        self.progress.send(ProgressEvent::Started { total });
        debug!("Analyzing with {}", self.estimator.describe());

        for (i, path) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("Cancelled after {} of {} files", i, total);
                summary.cancelled = true;
                break;
            }

            let outcome = self.process_file(path)?;
            summary.record(path, &outcome);
            self.progress.send(ProgressEvent::FileDone {
                index: i + 1,
                total,
                path: path.clone(),
                outcome,
            });
        }

        self.progress.send(ProgressEvent::Finished {
            cancelled: summary.cancelled,
        });
        Ok(summary)
    }

    /// Estimate and tag one file
    ///
    /// Per-file failures are returned as outcomes; only errors that are not
    /// about this file (none are expected) surface as `Err`.
    pub fn process_file(&self, path: &Path) -> Result<FileOutcome> {
        debug!("Processing {}", path.display());
        let result = discovery::check_access(path)
            .and_then(|()| {
                let scratch = self.scratch.next_file();
                self.estimator.estimate(path, &scratch)
            })
            .and_then(|bpm| {
                merge_tags(self.store.as_ref(), path, &[(BPM_TAG, TagValue::from(bpm))])?;
                Ok(bpm)
            });

        match result {
            Ok(bpm) => {
                info!("{}: {} BPM", path.display(), bpm);
                Ok(FileOutcome::Success { bpm })
            }
            Err(e) if e.is_recoverable() => {
                warn!("Skipping {}: {}", path.display(), e);
                FileOutcome::from_error(e)
            }
            Err(e) => Err(e),
        }
    }
}

/// Scan options for a tagging run
pub fn scan_options(settings: &TagSettings) -> ScanOptions {
    ScanOptions {
        extensions: settings.extensions.clone(),
        skip_patterns: settings.skip_patterns.clone(),
    }
}

/// What a run would process, grouped for display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DryRunPlan {
    /// File names per directory, directories sorted
    pub by_directory: BTreeMap<PathBuf, Vec<String>>,
    /// Upper-cased extension and count, most common first
    pub by_format: Vec<(String, usize)>,
    pub total: usize,
}

/// Enumerate candidates without decoding or tagging anything
pub fn plan_dry_run(settings: &TagSettings) -> Result<DryRunPlan> {
    let files = discovery::scan(&settings.input, &scan_options(settings))?;

    let mut plan = DryRunPlan {
        total: files.len(),
        ..DryRunPlan::default()
    };

    let mut by_format: HashMap<String, usize> = HashMap::new();
    for file in &files {
        let dir = file.parent().unwrap_or(file).to_path_buf();
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "?".to_string());
        plan.by_directory.entry(dir).or_default().push(name);

        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("unknown")
            .to_uppercase();
        *by_format.entry(ext).or_default() += 1;
    }

    plan.by_format = by_format.into_iter().collect();
    plan.by_format
        .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::traits::{TempoTracker, TrackerFactory};
    use crate::error::{BpmTagError, FailureKind};
    use crate::types::{TagSet, WindowSizes};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Copies the source when it is a WAV, fails otherwise
    struct CopyTranscoder;

    impl Transcoder for CopyTranscoder {
        fn transcode(&self, source: &Path, dest: &Path) -> Result<()> {
            hound::WavReader::open(source)
                .map_err(|e| BpmTagError::decode_error(source, e.to_string()))?;
            std::fs::copy(source, dest)
                .map_err(|e| BpmTagError::decode_error(source, e.to_string()))?;
            Ok(())
        }

        fn name(&self) -> &'static str {
            "copy"
        }
    }

    /// A beat every 43 blocks of 1024 at 44.1 kHz, about 60 BPM
    struct SteadyFactory;

    struct SteadyTracker {
        blocks: u64,
    }

    impl TempoTracker for SteadyTracker {
        fn process(&mut self, _block: &[f32]) -> Result<Option<f64>> {
            let index = self.blocks;
            self.blocks += 1;
            Ok((index % 43 == 0).then(|| index as f64 * 1024.0 / 44_100.0))
        }
    }

    impl TrackerFactory for SteadyFactory {
        fn create(&self, _sizes: WindowSizes, _rate: u32) -> Result<Box<dyn TempoTracker>> {
            Ok(Box::new(SteadyTracker { blocks: 0 }))
        }

        fn name(&self) -> &'static str {
            "steady"
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        written: Mutex<Vec<(PathBuf, TagSet)>>,
    }

    impl TagStore for RecordingStore {
        fn read(&self, _path: &Path) -> Result<TagSet> {
            Ok(TagSet::new())
        }

        fn apply(&self, path: &Path, changes: &TagSet) -> Result<()> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), changes.clone()));
            Ok(())
        }
    }

    fn write_silence(path: &Path, seconds: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..44_100 * seconds {
            w.write_sample(0i16).unwrap();
        }
        w.finalize().unwrap();
    }

    fn job(store: Arc<RecordingStore>, cancel: CancellationToken) -> BatchJob {
        let estimator = TempoEstimator::new(Arc::new(CopyTranscoder), Arc::new(SteadyFactory));
        BatchJob::new(
            estimator,
            store,
            ScratchSpace::new(None).unwrap(),
            ScanOptions {
                extensions: vec!["wav".to_string()],
                skip_patterns: vec!["Thumbs".to_string()],
            },
            cancel,
        )
    }

    #[test]
    fn test_failure_isolated_to_one_file() {
        let dir = TempDir::new().unwrap();
        let good_a = dir.path().join("a.wav");
        let broken = dir.path().join("b.wav");
        let good_c = dir.path().join("c.wav");
        write_silence(&good_a, 3);
        std::fs::write(&broken, b"garbage").unwrap();
        write_silence(&good_c, 3);

        let store = Arc::new(RecordingStore::default());
        let job = job(store.clone(), CancellationToken::new());
        let summary = job
            .process_files(&[broken.clone(), good_a.clone(), good_c.clone()])
            .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].path, broken);
        assert_eq!(summary.failed[0].kind, FailureKind::Decode);
        assert_eq!(store.written.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_bpm_written_under_bpm_key() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.wav");
        write_silence(&file, 4);

        let store = Arc::new(RecordingStore::default());
        let outcome = job(store.clone(), CancellationToken::new())
            .process_file(&file)
            .unwrap();

        let bpm = outcome.bpm().unwrap();
        let written = store.written.lock().unwrap();
        assert_eq!(written[0].1.first("bpm"), Some(bpm.to_tag_value().as_str()));
    }

    #[test]
    fn test_vanished_file_is_path_unavailable() {
        let store = Arc::new(RecordingStore::default());
        let outcome = job(store, CancellationToken::new())
            .process_file(Path::new("/nonexistent/gone.wav"))
            .unwrap();
        assert!(matches!(outcome, FileOutcome::PathUnavailable { .. }));
    }

    #[test]
    fn test_cancelled_before_start_processes_nothing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.wav");
        write_silence(&file, 3);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let store = Arc::new(RecordingStore::default());
        let summary = job(store.clone(), cancel).process_files(&[file]).unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed, 0);
        assert!(store.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_plan_groups_by_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("one.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("sub").join("two.MP3"), b"x").unwrap();
        std::fs::write(dir.path().join("Thumbs.mp3"), b"x").unwrap();

        let settings = TagSettings {
            input: dir.path().to_path_buf(),
            ..TagSettings::default()
        };
        let plan = plan_dry_run(&settings).unwrap();

        assert_eq!(plan.total, 2);
        assert_eq!(plan.by_directory.len(), 2);
        assert_eq!(plan.by_format, vec![("MP3".to_string(), 2)]);
    }
}
