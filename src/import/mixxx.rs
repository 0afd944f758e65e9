//! Read-only access to a Mixxx library database

use crate::error::{BpmTagError, Result};
use crate::types::{BpmEstimate, TagValue};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

const PAGE_QUERY: &str = "\
    SELECT library.id, track_locations.location, library.artist, library.title, \
           library.album, library.genre, library.year, library.key, library.bpm \
    FROM library \
    LEFT JOIN track_locations ON library.location = track_locations.id \
    ORDER BY library.id \
    LIMIT ?1 OFFSET ?2";

/// One row of the `library` table with its file location
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryRecord {
    pub id: i64,
    /// Path as stored by Mixxx, possibly from another OS
    pub location: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
    pub key: Option<String>,
    pub bpm: Option<f64>,
}

impl LibraryRecord {
    /// Rounded BPM, when Mixxx has analyzed the track
    pub fn bpm_estimate(&self) -> Option<BpmEstimate> {
        self.bpm.filter(|bpm| *bpm > 0.0).and_then(BpmEstimate::new)
    }

    /// Tag updates copied from this record
    ///
    /// The album artist is the track artist. Missing or blank fields are
    /// left out rather than written empty.
    pub fn tag_updates(&self) -> Vec<(&'static str, TagValue)> {
        let mut updates = Vec::new();
        if let Some(bpm) = self.bpm_estimate() {
            updates.push(("BPM", TagValue::from(bpm)));
        }

        let fields = [
            ("KEY", &self.key),
            ("ARTIST", &self.artist),
            ("TITLE", &self.title),
            ("ALBUMARTIST", &self.artist),
            ("GENRE", &self.genre),
            ("ALBUM", &self.album),
            ("YEAR", &self.year),
        ];
        for (name, value) in fields {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                updates.push((name, TagValue::from(value)));
            }
        }
        updates
    }
}

/// An open Mixxx `mixxxdb.sqlite`
pub struct MixxxLibrary {
    conn: Connection,
    path: PathBuf,
}

impl MixxxLibrary {
    /// Open `path` read-only
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BpmTagError::DatabaseError {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| db_error(path, e))?;

        let library = Self {
            conn,
            path: path.to_path_buf(),
        };
        // Fail early on files that are not Mixxx libraries
        library.count()?;
        debug!("Opened Mixxx library {}", path.display());
        Ok(library)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of rows in `library`
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM library", [], |row| row.get(0))
            .map_err(|e| db_error(&self.path, e))?;
        Ok(count.max(0) as usize)
    }

    /// Up to `limit` records starting at `offset`, ordered by id
    pub fn page(&self, offset: usize, limit: usize) -> Result<Vec<LibraryRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached(PAGE_QUERY)
            .map_err(|e| db_error(&self.path, e))?;

        let rows = stmt
            .query_map(params![limit as i64, offset as i64], read_record)
            .map_err(|e| db_error(&self.path, e))?;

        let records = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| db_error(&self.path, e))?;
        Ok(records)
    }
}

fn db_error(path: &Path, err: rusqlite::Error) -> BpmTagError {
    BpmTagError::DatabaseError {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<LibraryRecord> {
    Ok(LibraryRecord {
        id: row.get(0)?,
        location: text(row, 1)?,
        artist: text(row, 2)?,
        title: text(row, 3)?,
        album: text(row, 4)?,
        genre: text(row, 5)?,
        year: text(row, 6)?,
        key: text(row, 7)?,
        bpm: number(row, 8)?,
    })
}

/// Column as text, whatever SQLite storage class it was written with
fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
    })
}

fn number(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).trim().parse().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}
