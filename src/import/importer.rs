//! Copying Mixxx analysis results into file tags
//!
//! Pure metadata copy: no audio is decoded. Records are read a page at a
//! time and cancellation is checked between pages.

use super::locate::{locate_database, resolve_database_arg};
use super::location::LocationResolver;
use super::mixxx::{LibraryRecord, MixxxLibrary};
use crate::config::ImportSettings;
use crate::error::{BpmTagError, FailureKind, Result};
use crate::pipeline::{CancellationToken, FailedFile, ProgressEvent, ProgressReporter};
use crate::tags::{merge_tags, LoftyTagStore, TagStore};
use crate::types::BpmEstimate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A file updated from the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedTrack {
    pub path: PathBuf,
    pub bpm: Option<BpmEstimate>,
    pub key: Option<String>,
}

/// Result of an import run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Rows in the library
    pub total: usize,
    /// Rows read before the run ended
    pub processed: usize,
    pub tagged: Vec<ImportedTrack>,
    /// Rows whose location is not a local file, or with nothing to copy
    pub skipped: usize,
    pub failed: Vec<FailedFile>,
    pub cancelled: bool,
}

impl ImportSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

/// One import run over a library
pub struct ImportJob {
    library: MixxxLibrary,
    store: Arc<dyn TagStore>,
    resolver: LocationResolver,
    page_size: usize,
    cancel: CancellationToken,
    progress: ProgressReporter,
}

impl ImportJob {
    pub fn new(
        library: MixxxLibrary,
        store: Arc<dyn TagStore>,
        resolver: LocationResolver,
        page_size: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            library,
            store,
            resolver,
            page_size: page_size.max(1),
            cancel,
            progress: ProgressReporter::detached(),
        }
    }

    /// Open the configured (or located) library with the lofty tag store
    pub fn from_settings(settings: &ImportSettings, cancel: CancellationToken) -> Result<Self> {
        let path = match &settings.database {
            Some(arg) => resolve_database_arg(arg),
            None => locate_database()?,
        };
        info!("Reading Mixxx library {}", path.display());

        Ok(Self::new(
            MixxxLibrary::open(&path)?,
            Arc::new(LoftyTagStore::new()),
            LocationResolver::detect(),
            settings.page_size,
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

    /// Copy tags for every record, page by page
    pub fn run(&self) -> Result<ImportSummary> {
        let start = Instant::now();
        let total = self.library.count()?;
        info!(
            "Importing {} records from {}",
            total,
            self.library.path().display()
        );
        let mut summary = ImportSummary {
            total,
            ..ImportSummary::default()
        };
        self.progress.send(ProgressEvent::Started { total });

        let mut offset = 0;
        while offset < total {
            if self.cancel.is_cancelled() {
                info!("Import cancelled after {} of {} records", offset, total);
                summary.cancelled = true;
                break;
            }

            let records = self.library.page(offset, self.page_size)?;
            if records.is_empty() {
                break;
            }
            for record in &records {
                self.import_record(record, &mut summary);
            }

            offset += records.len();
            summary.processed = offset;
            self.progress.send(ProgressEvent::PageDone {
                processed: offset,
                total,
            });
        }

        self.progress.send(ProgressEvent::Finished {
            cancelled: summary.cancelled,
        });
        info!(
            "Imported tags for {} of {} records in {:.2}s ({} skipped, {} failed)",
            summary.tagged.len(),
            total,
            start.elapsed().as_secs_f64(),
            summary.skipped,
            summary.failed.len()
        );
        Ok(summary)
    }

    fn import_record(&self, record: &LibraryRecord, summary: &mut ImportSummary) {
        let Some(path) = record
            .location
            .as_deref()
            .and_then(|raw| self.resolver.resolve(raw))
        else {
            debug!("Skipping record {}: no local file", record.id);
            summary.skipped += 1;
            return;
        };

        let updates = record.tag_updates();
        if updates.is_empty() {
            debug!("Skipping {}: nothing to copy", path.display());
            summary.skipped += 1;
            return;
        }

        match merge_tags(self.store.as_ref(), &path, &updates) {
            Ok(_) => {
                debug!("Imported tags into {}", path.display());
                summary.tagged.push(ImportedTrack {
                    bpm: record.bpm_estimate(),
                    key: record.key.clone(),
                    path,
                });
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                let reason = match e {
                    BpmTagError::TagWriteError { reason, .. } => reason,
                    other => other.to_string(),
                };
                summary.failed.push(FailedFile {
                    path,
                    kind: FailureKind::TagWrite,
                    reason,
                });
            }
        }
    }
}
