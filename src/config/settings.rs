//! Runtime configuration settings

use super::cli::{ImportArgs, TagArgs};
use crate::error::{BpmTagError, Result};
use crate::types::AudioFormat;
use std::path::PathBuf;

/// File-name fragments never processed (sidecar and shortcut artifacts)
pub const DEFAULT_SKIP_PATTERNS: &[&str] = &["desktop", "Thumbs", "order", "Videos - Shortcut"];

/// Library rows read per page by the importer
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Runtime settings for a tagging run
#[derive(Debug, Clone)]
pub struct TagSettings {
    /// Directory (or single file) to process
    pub input: PathBuf,
    /// Lower-cased extensions without the dot
    pub extensions: Vec<String>,
    /// File-name substrings to skip
    pub skip_patterns: Vec<String>,
    /// External ffmpeg binary; built-in decoder when absent
    pub ffmpeg: Option<PathBuf>,
    /// Parent directory for the job's scratch space
    pub scratch_dir: Option<PathBuf>,
    /// JSON report destination
    pub report: Option<PathBuf>,
    /// Show progress bar
    pub show_progress: bool,
    /// Dry run mode - list files without processing
    pub dry_run: bool,
}

impl TagSettings {
    /// Create settings from CLI arguments
    pub fn from_args(args: &TagArgs, quiet: bool) -> Result<Self> {
        let extensions = args
            .extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect::<Result<Vec<_>>>()?;

        let skip_patterns = if args.skip.is_empty() {
            DEFAULT_SKIP_PATTERNS.iter().map(|s| s.to_string()).collect()
        } else {
            args.skip.clone()
        };

        Ok(Self {
            input: args.input.clone(),
            extensions,
            skip_patterns,
            ffmpeg: args.ffmpeg.clone(),
            scratch_dir: args.scratch_dir.clone(),
            report: args.report.clone(),
            show_progress: !quiet,
            dry_run: args.dry_run,
        })
    }
}

impl Default for TagSettings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            extensions: vec!["mp3".to_string()],
            skip_patterns: DEFAULT_SKIP_PATTERNS.iter().map(|s| s.to_string()).collect(),
            ffmpeg: None,
            scratch_dir: None,
            report: None,
            show_progress: true,
            dry_run: false,
        }
    }
}

/// Runtime settings for a Mixxx import
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Database file or directory; located automatically when absent
    pub database: Option<PathBuf>,
    /// Rows per page
    pub page_size: usize,
    /// JSON report destination
    pub report: Option<PathBuf>,
    /// Show progress bar
    pub show_progress: bool,
}

impl ImportSettings {
    /// Create settings from CLI arguments
    pub fn from_args(args: &ImportArgs, quiet: bool) -> Result<Self> {
        if args.page_size == 0 {
            return Err(BpmTagError::ConfigError(
                "--page-size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            database: args.database.clone(),
            page_size: args.page_size,
            report: args.report.clone(),
            show_progress: !quiet,
        })
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            database: None,
            page_size: DEFAULT_PAGE_SIZE,
            report: None,
            show_progress: true,
        }
    }
}

/// Lower-case an extension, strip its dot, and check it can be decoded
fn normalize_extension(ext: &str) -> Result<String> {
    let ext = ext.trim().trim_start_matches('.').to_lowercase();
    if AudioFormat::from_extension(&ext).is_none() {
        return Err(BpmTagError::ConfigError(format!(
            "Unsupported extension '{}'. Supported: mp3, wav, flac, aiff, aif, ogg, m4a, mp4",
            ext
        )));
    }
    Ok(ext)
}
