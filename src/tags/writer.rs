//! Merging new values into a file's existing tags

use super::store::TagStore;
use crate::error::{BpmTagError, Result};
use crate::types::{TagSet, TagValue};
use std::path::Path;
use tracing::debug;

/// Merge `updates` into the tags of `path`
///
/// Keys are compared case-insensitively and multi-valued updates are
/// flattened to one `", "`-joined value. Only keys whose value actually
/// changes are written, so unrelated tags are left as they are and merging
/// the same updates twice writes nothing the second time.
///
/// Returns the merged tag set. Every failure is a `TagWriteError`.
pub fn merge_tags<K: AsRef<str>>(
    store: &dyn TagStore,
    path: &Path,
    updates: &[(K, TagValue)],
) -> Result<TagSet> {
    merge_inner(store, path, updates).map_err(|e| {
        let err = match e {
            BpmTagError::TagWriteError { .. } => e.for_file(path),
            other => BpmTagError::tag_write_error(path, other),
        };
        debug!("{}", err);
        err
    })
}

fn merge_inner<K: AsRef<str>>(
    store: &dyn TagStore,
    path: &Path,
    updates: &[(K, TagValue)],
) -> Result<TagSet> {
    let mut merged = store.read(path)?;
    let mut changes = TagSet::new();

    for (key, value) in updates {
        let key = key.as_ref();
        let flattened = value.flatten();
        let unchanged = matches!(merged.get(key), Some([current]) if *current == flattened);
        if unchanged {
            continue;
        }
        changes.set(key, value);
        merged.set(key, value);
    }

    if changes.is_empty() {
        debug!("Tags already up to date in {}", path.display());
        return Ok(merged);
    }

    store.apply(path, &changes)?;
    debug!(
        "Updated {} in {}",
        changes.keys().collect::<Vec<_>>().join(", "),
        path.display()
    );
    Ok(merged)
}
