//! Core data types for bpmtag
//!
//! These types represent the domain model and flow through the pipeline.

use crate::error::{BpmTagError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Analysis parameters
// =============================================================================

/// Analysis task, selecting window and hop sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisTask {
    Pitch,
    Onset,
    Beat,
    Mfcc,
}

impl AnalysisTask {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisTask::Pitch => "pitch",
            AnalysisTask::Onset => "onset",
            AnalysisTask::Beat => "beat",
            AnalysisTask::Mfcc => "mfcc",
        }
    }
}

impl FromStr for AnalysisTask {
    type Err = BpmTagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pitch" => Ok(AnalysisTask::Pitch),
            "onset" => Ok(AnalysisTask::Onset),
            "beat" => Ok(AnalysisTask::Beat),
            "mfcc" => Ok(AnalysisTask::Mfcc),
            other => Err(BpmTagError::UnknownTask(other.to_string())),
        }
    }
}

impl fmt::Display for AnalysisTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frame and hop sizes, in samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSizes {
    /// Samples considered in one analysis frame
    pub window: usize,
    /// Samples advanced between successive frames
    pub hop: usize,
}

// =============================================================================
// Beat timestamps and BPM
// =============================================================================

/// Beat timestamps in seconds since stream start, non-decreasing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatTimestamps(Vec<f64>);

impl BeatTimestamps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamp
    ///
    /// Returns false (and drops the value) if it is earlier than the last one
    /// or not finite.
    pub fn push(&mut self, seconds: f64) -> bool {
        if !seconds.is_finite() {
            return false;
        }
        if let Some(&last) = self.0.last() {
            if seconds < last {
                return false;
            }
        }
        self.0.push(seconds);
        true
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<f64> for BeatTimestamps {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut beats = BeatTimestamps::new();
        for t in iter {
            beats.push(t);
        }
        beats
    }
}

/// Tempo estimate, rounded to two decimal places
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BpmEstimate(f64);

impl BpmEstimate {
    /// Round `bpm` to two decimals; rejects negative and non-finite values
    pub fn new(bpm: f64) -> Option<Self> {
        if bpm.is_finite() && bpm >= 0.0 {
            Some(Self((bpm * 100.0).round() / 100.0))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Text stored in the BPM tag: "120.0", "128.5", "128.57"
    pub fn to_tag_value(self) -> String {
        let text = format!("{:.2}", self.0);
        let trimmed = text.trim_end_matches('0');
        if trimmed.ends_with('.') {
            format!("{}0", trimmed)
        } else {
            trimmed.to_string()
        }
    }
}

impl fmt::Display for BpmEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// =============================================================================
// Tags
// =============================================================================

/// A tag value to merge into a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Single(String),
    /// Flattened to a single `", "`-joined string when stored
    Multi(Vec<String>),
}

impl TagValue {
    pub fn flatten(&self) -> String {
        match self {
            TagValue::Single(value) => value.clone(),
            TagValue::Multi(values) => values.join(", "),
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Single(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Single(value)
    }
}

impl From<Vec<String>> for TagValue {
    fn from(values: Vec<String>) -> Self {
        TagValue::Multi(values)
    }
}

impl From<BpmEstimate> for TagValue {
    fn from(bpm: BpmEstimate) -> Self {
        TagValue::Single(bpm.to_tag_value())
    }
}

/// File tags keyed by lower-cased name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet(BTreeMap<String, Vec<String>>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a tag key for comparison and storage
    pub fn normalize_key(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Append a value under `key`, keeping any values already present
    pub fn push_value(&mut self, key: &str, value: impl Into<String>) {
        self.0
            .entry(Self::normalize_key(key))
            .or_default()
            .push(value.into());
    }

    /// Replace the values for `key` with the flattened `value`
    pub fn set(&mut self, key: &str, value: &TagValue) {
        self.0.insert(Self::normalize_key(key), vec![value.flatten()]);
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(&Self::normalize_key(key)).map(Vec::as_slice)
    }

    /// First value for `key`, if any
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(&Self::normalize_key(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>> FromIterator<(K, TagValue)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, TagValue)>>(iter: I) -> Self {
        let mut tags = TagSet::new();
        for (key, value) in iter {
            tags.set(key.as_ref(), &value);
        }
        tags
    }
}

// =============================================================================
// Supported formats
// =============================================================================

/// Audio formats bpmtag can decode and tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Aiff,
    Ogg,
    M4a,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "aiff" | "aif" => Some(AudioFormat::Aiff),
            "ogg" => Some(AudioFormat::Ogg),
            "m4a" | "mp4" => Some(AudioFormat::M4a),
            _ => None,
        }
    }
}
