//! Temporary storage for decoded audio
//!
//! Each job owns one `ScratchSpace` (a private temporary directory). Every
//! file being analyzed gets its own `ScratchFile` path inside it, deleted
//! when the guard drops, so concurrent jobs or workers never share a path.

use crate::error::{BpmTagError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::{debug, error};

/// Per-job temporary directory, removed when dropped
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
    counter: AtomicUsize,
}

impl ScratchSpace {
    /// Create a scratch directory under `parent`, or the system temp dir
    pub fn new(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("bpmtag-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| {
            BpmTagError::output_error(parent.map(Path::to_path_buf).unwrap_or_default(), e)
        })?;

        debug!("Scratch space at {}", dir.path().display());
        Ok(Self {
            dir,
            counter: AtomicUsize::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Allocate a fresh WAV path for one file's decoded audio
    pub fn next_file(&self) -> ScratchFile {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        ScratchFile {
            path: self.dir.path().join(format!("decoded-{:05}.wav", n)),
        }
    }
}

/// Scratch path deleted on drop, whether or not anything was written
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Deleted temp file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!("Failed to delete temporary file {}: {}", self.path.display(), e),
        }
    }
}
