//! JSON run reports

use crate::error::{BpmTagError, FailureKind, Result};
use crate::import::ImportSummary;
use crate::pipeline::{BatchSummary, FailedFile};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// JSON output schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON report structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward compatibility
    pub version: String,
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub tagged: Vec<TaggedJson>,
    pub failed: Vec<FailedJson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// bpmtag version that generated this file
    pub generator_version: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    /// `tag` or `import`
    pub tool: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedJson {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedJson {
    pub path: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl RunReport {
    fn new(tool: &str, summary: ReportSummary, tagged: Vec<TaggedJson>, failed: &[FailedFile]) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            metadata: ReportMetadata {
                generator_version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: chrono::Utc::now().to_rfc3339(),
                tool: tool.to_string(),
            },
            summary,
            tagged,
            failed: failed
                .iter()
                .map(|f| FailedJson {
                    path: f.path.to_string_lossy().to_string(),
                    kind: f.kind,
                    reason: f.reason.clone(),
                })
                .collect(),
        }
    }

    /// Report for a tagging run
    pub fn from_batch(summary: &BatchSummary) -> Self {
        let tagged = summary
            .tagged
            .iter()
            .map(|t| TaggedJson {
                path: t.path.to_string_lossy().to_string(),
                bpm: Some(t.bpm.value()),
                key: None,
            })
            .collect();

        Self::new(
            "tag",
            ReportSummary {
                total: summary.total,
                processed: summary.processed,
                succeeded: summary.succeeded,
                failed: summary.failed.len(),
                skipped: summary.remaining(),
                cancelled: summary.cancelled,
            },
            tagged,
            &summary.failed,
        )
    }

    /// Report for a library import
    pub fn from_import(summary: &ImportSummary) -> Self {
        let tagged = summary
            .tagged
            .iter()
            .map(|t| TaggedJson {
                path: t.path.to_string_lossy().to_string(),
                bpm: t.bpm.map(|b| b.value()),
                key: t.key.clone(),
            })
            .collect();

        Self::new(
            "import",
            ReportSummary {
                total: summary.total,
                processed: summary.processed,
                succeeded: summary.tagged.len(),
                failed: summary.failed.len(),
                skipped: summary.skipped,
                cancelled: summary.cancelled,
            },
            tagged,
            &summary.failed,
        )
    }
}

/// Write a report to a JSON file
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
pub fn write_report(report: &RunReport, output_path: &Path) -> Result<()> {
    // Same directory keeps the rename on one filesystem
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| BpmTagError::output_error(output_path, e))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, report).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        BpmTagError::OutputError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        BpmTagError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!(
        "Wrote report for {} tagged file(s) to {}",
        report.tagged.len(),
        output_path.display()
    );
    Ok(())
}

/// Read a report written by [`write_report`]
pub fn read_report(path: &Path) -> Result<RunReport> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| BpmTagError::OutputError {
        path: path.to_path_buf(),
        reason: format!("Invalid report: {}", e),
    })
}
