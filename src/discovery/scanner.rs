//! File discovery and scanning

use crate::error::{BpmTagError, Result};
use std::fs::OpenOptions;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What counts as a candidate file
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lower-cased extensions without the dot
    pub extensions: Vec<String>,
    /// File-name substrings that exclude a file (case-sensitive)
    pub skip_patterns: Vec<String>,
}

/// Scan a path (file or directory) for candidate audio files
///
/// Directories are walked recursively in the platform's enumeration order.
/// Returned paths are lexically normalized.
pub fn scan(input: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        return Err(BpmTagError::InvalidInput(format!(
            "Input path does not exist: {}",
            input.display()
        )));
    }

    let mut files = Vec::new();

    if input.is_file() {
        // Single file mode
        if is_candidate(input, options) {
            files.push(normalize_path(input));
        } else {
            return Err(BpmTagError::InvalidInput(format!(
                "'{}' does not have a selected extension ({})",
                input.display(),
                options.extensions.join(", ")
            )));
        }
    } else {
        for entry in WalkDir::new(input) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && is_candidate(entry.path(), options) {
                let path = normalize_path(entry.path());
                debug!("Discovered: {}", path.display());
                files.push(path);
            }
        }
    }

    info!("Discovered {} audio files", files.len());

    if files.is_empty() {
        warn!("No matching audio files found in {}", input.display());
    }

    Ok(files)
}

/// Check the file name against the extension list and the denylist
pub fn is_candidate(path: &Path, options: &ScanOptions) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    let lower = name.to_lowercase();
    let has_extension = options
        .extensions
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)));

    has_extension && !options.skip_patterns.iter().any(|p| name.contains(p.as_str()))
}

/// Verify a file still exists and can be opened for reading and writing
///
/// Files can vanish, or their volume be ejected, between the scan and the
/// moment they are processed.
pub fn check_access(path: &Path) -> Result<()> {
    let metadata =
        std::fs::metadata(path).map_err(|e| BpmTagError::path_unavailable(path, &e))?;

    if !metadata.is_file() {
        return Err(BpmTagError::PathUnavailable {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    if metadata.permissions().readonly() {
        return Err(BpmTagError::PathUnavailable {
            path: path.to_path_buf(),
            reason: "file is read-only".to_string(),
        });
    }

    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map(drop)
        .map_err(|e| BpmTagError::path_unavailable(path, &e))
}

/// Lexically normalize a path: drop `.` components, resolve `..`
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) && normalized.pop();
                if !popped {
                    normalized.push(component.as_os_str());
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
