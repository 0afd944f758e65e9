//! Tag storage backends
//!
//! Uses lofty to read and write ID3v2 (MP3), Vorbis comments (FLAC, OGG),
//! MP4 ilst, and RIFF/AIFF tags through its format-agnostic `Tag`.

use crate::error::{BpmTagError, ErrorContext, Result};
use crate::types::TagSet;
use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag, TagType};
use std::path::Path;
use tracing::{debug, trace};

/// A key/value metadata store scoped to one file per call
pub trait TagStore: Send + Sync {
    /// Read all text tags, keyed by lower-cased name
    fn read(&self, path: &Path) -> Result<TagSet>;

    /// Replace the values of every key in `changes`, leaving other keys alone
    fn apply(&self, path: &Path, changes: &TagSet) -> Result<()>;
}

/// Well-known tag names, lower-cased
pub const KNOWN_NAMES: &[&str] = &[
    "artist",
    "title",
    "album",
    "albumartist",
    "genre",
    "year",
    "bpm",
    "key",
    "comment",
    "tracknumber",
    "discnumber",
    "composer",
];

/// lofty key for a lower-cased tag name in a tag of type `tag_type`
///
/// ID3v2 only carries the tempo as TBPM, which lofty exposes as `IntegerBpm`.
fn item_key(name: &str, tag_type: TagType) -> ItemKey {
    match name {
        "artist" => ItemKey::TrackArtist,
        "title" => ItemKey::TrackTitle,
        "album" => ItemKey::AlbumTitle,
        "albumartist" => ItemKey::AlbumArtist,
        "genre" => ItemKey::Genre,
        "year" | "date" => ItemKey::RecordingDate,
        "bpm" if tag_type == TagType::Id3v2 => ItemKey::IntegerBpm,
        "bpm" => ItemKey::Bpm,
        "key" => ItemKey::InitialKey,
        "comment" => ItemKey::Comment,
        "tracknumber" => ItemKey::TrackNumber,
        "discnumber" => ItemKey::DiscNumber,
        "composer" => ItemKey::Composer,
        other => ItemKey::Unknown(other.to_uppercase()),
    }
}

fn known_name(key: &ItemKey) -> Option<&'static str> {
    let name = match key {
        ItemKey::TrackArtist => "artist",
        ItemKey::TrackTitle => "title",
        ItemKey::AlbumTitle => "album",
        ItemKey::AlbumArtist => "albumartist",
        ItemKey::Genre => "genre",
        ItemKey::RecordingDate => "year",
        ItemKey::Bpm | ItemKey::IntegerBpm => "bpm",
        ItemKey::InitialKey => "key",
        ItemKey::Comment => "comment",
        ItemKey::TrackNumber => "tracknumber",
        ItemKey::DiscNumber => "discnumber",
        ItemKey::Composer => "composer",
        _ => return None,
    };
    Some(name)
}

/// Tag name for a lofty key, as seen in a tag of type `tag_type`
fn key_name(key: &ItemKey, tag_type: TagType) -> Option<String> {
    if let Some(name) = known_name(key) {
        return Some(name.to_string());
    }
    match key {
        ItemKey::Unknown(raw) => Some(TagSet::normalize_key(raw)),
        other => other.map_key(tag_type, true).map(TagSet::normalize_key),
    }
}

/// Tag store backed by lofty
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagStore;

impl LoftyTagStore {
    pub fn new() -> Self {
        Self
    }
}

impl TagStore for LoftyTagStore {
    fn read(&self, path: &Path) -> Result<TagSet> {
        let tagged_file = Probe::open(path).tag_context(path)?.read().tag_context(path)?;

        let mut tags = TagSet::new();
        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            debug!("No tags found in {}", path.display());
            return Ok(tags);
        };

        for item in tag.items() {
            let (Some(name), Some(text)) = (key_name(item.key(), tag.tag_type()), item.value().text())
            else {
                continue;
            };
            // `Bpm` and `IntegerBpm` can both surface under "bpm"
            if tags.get(&name).is_some_and(|values| values.iter().any(|v| v == text)) {
                continue;
            }
            tags.push_value(&name, text);
        }

        trace!("Read {} tag keys from {}", tags.len(), path.display());
        Ok(tags)
    }

    fn apply(&self, path: &Path, changes: &TagSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tagged_file = Probe::open(path).tag_context(path)?.read().tag_context(path)?;
        let tag_type = tagged_file.primary_tag_type();

        if tagged_file.tag(tag_type).is_none() {
            debug!("Creating {:?} tag in {}", tag_type, path.display());
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file.tag_mut(tag_type).ok_or_else(|| {
            BpmTagError::tag_write_error(path, format!("cannot create a {:?} tag", tag_type))
        })?;

        for (name, values) in changes.iter() {
            let key = item_key(name, tag_type);
            tag.remove_key(&key);
            let value = values.join(", ");
            if !tag.insert_text(key, value) {
                return Err(BpmTagError::tag_write_error(
                    path,
                    format!("'{}' is not supported by {:?} tags", name, tag_type),
                ));
            }
        }

        tag.save_to_path(path, WriteOptions::default())
            .tag_context(path)?;
        debug!("Wrote {} tag key(s) to {}", changes.len(), path.display());
        Ok(())
    }
}
