//! Finding the Mixxx database

use super::location::{is_wsl, translate_windows_path};
use crate::error::{BpmTagError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the Mixxx library database
pub const DATABASE_FILENAME: &str = "mixxxdb.sqlite";

/// Environment variable naming the database (or its directory)
pub const DATABASE_ENV: &str = "BPMTAG_MIXXX_DB";

/// Resolve a user-supplied database argument
///
/// Accepts the database file itself or the directory holding it. Under WSL
/// a Windows path is mapped onto `/mnt/<drive>` first.
pub fn resolve_database_arg(arg: &Path) -> PathBuf {
    let path = match arg.to_str() {
        Some(raw) if is_wsl() => PathBuf::from(translate_windows_path(raw)),
        _ => arg.to_path_buf(),
    };
    if path.is_dir() {
        path.join(DATABASE_FILENAME)
    } else {
        path
    }
}

/// Mixxx settings directories for this platform, most likely first
fn platform_locations() -> Vec<PathBuf> {
    let Some(base_dirs) = directories::BaseDirs::new() else {
        return Vec::new();
    };
    let home = base_dirs.home_dir();
    vec![
        // Linux
        home.join(".mixxx"),
        home.join(".var/app/org.mixxx.Mixxx/.mixxx"),
        // Windows (%LOCALAPPDATA%\Mixxx)
        base_dirs.data_local_dir().join("Mixxx"),
        // macOS, sandboxed and not
        home.join("Library/Containers/org.mixxx.mixxx/Data/Library/Application Support/Mixxx"),
        home.join("Library/Application Support/Mixxx"),
    ]
}

/// Find the Mixxx database
///
/// Search order:
/// 1. `BPMTAG_MIXXX_DB`
/// 2. The platform's Mixxx settings directories
/// 3. `./mixxxdb.sqlite`
pub fn locate_database() -> Result<PathBuf> {
    let mut checked_locations: Vec<String> = Vec::new();

    if let Some(env_path) = std::env::var_os(DATABASE_ENV) {
        let path = resolve_database_arg(Path::new(&env_path));
        if path.is_file() {
            return Ok(path);
        }
        checked_locations.push(format!("{}={}", DATABASE_ENV, path.display()));
    }

    for dir in platform_locations() {
        let path = dir.join(DATABASE_FILENAME);
        if path.is_file() {
            debug!("Found Mixxx library at {}", path.display());
            return Ok(path);
        }
        checked_locations.push(path.display().to_string());
    }

    let cwd_path = PathBuf::from(".").join(DATABASE_FILENAME);
    if cwd_path.is_file() {
        return Ok(cwd_path.canonicalize().unwrap_or(cwd_path));
    }
    checked_locations.push(cwd_path.display().to_string());

    let locations_list = checked_locations
        .iter()
        .map(|loc| format!("  - {}", loc))
        .collect::<Vec<_>>()
        .join("\n");

    Err(BpmTagError::InvalidInput(format!(
        "Mixxx library not found. Checked:\n{}\n\n  Tip: Pass the database path, or set {}",
        locations_list, DATABASE_ENV
    )))
}
