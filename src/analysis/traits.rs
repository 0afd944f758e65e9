//! Analysis trait abstractions
//!
//! These traits define the interface for swappable beat-tracking backends.
//! The estimator only sees a stream of hop-sized blocks going in and
//! optional beat timestamps coming out.

use crate::error::Result;
use crate::types::WindowSizes;

/// Streaming tempo tracker
///
/// Fed successive hop-sized blocks of mono samples; reports at most one
/// beat per block.
pub trait TempoTracker {
    /// Process one block
    ///
    /// Returns the beat's timestamp in seconds since stream start when a beat
    /// is detected for this block.
    fn process(&mut self, block: &[f32]) -> Result<Option<f64>>;
}

/// Builds a tracker for one file's stream parameters
pub trait TrackerFactory: Send + Sync {
    fn create(&self, sizes: WindowSizes, sample_rate: u32) -> Result<Box<dyn TempoTracker>>;

    /// Get the name of this tracker (for logging)
    fn name(&self) -> &'static str;
}
