//! Resolving library locations to local files

use std::path::PathBuf;
use tracing::trace;

/// True when running under Windows Subsystem for Linux
pub fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|release| release.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}

/// Map a Windows path onto the WSL mount layout
///
/// `C:\Music\a.mp3` and `C:/Music/a.mp3` become `/mnt/c/Music/a.mp3`.
/// Paths without a drive letter only have their separators replaced.
pub fn translate_windows_path(raw: &str) -> String {
    let forward = raw.replace('\\', "/");
    let bytes = forward.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let drive = (bytes[0] as char).to_ascii_lowercase();
        let rest = forward[2..].trim_start_matches('/');
        format!("/mnt/{}/{}", drive, rest)
    } else {
        forward
    }
}

/// Turns stored locations into paths of existing files
#[derive(Debug, Clone, Copy)]
pub struct LocationResolver {
    translate: bool,
}

impl LocationResolver {
    pub fn new(translate: bool) -> Self {
        Self { translate }
    }

    /// Translate Windows paths only when running under WSL
    pub fn detect() -> Self {
        Self::new(is_wsl())
    }

    /// Local path for `raw`, or `None` when it is not an existing regular file
    pub fn resolve(&self, raw: &str) -> Option<PathBuf> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let path = if self.translate {
            PathBuf::from(translate_windows_path(raw))
        } else {
            PathBuf::from(raw)
        };
        if path.is_file() {
            Some(path)
        } else {
            trace!("Location {} does not resolve to a file", path.display());
            None
        }
    }
}
