//! Tempo analysis
//!
//! Window policy, a swappable streaming beat tracker, and reduction of
//! beat timestamps to a single BPM. The trait abstraction allows swapping
//! trackers without changing pipeline code.

pub mod estimator;
pub mod reduce;
pub mod tracker;
pub mod traits;
pub mod windowing;

pub use estimator::TempoEstimator;
pub use reduce::{instantaneous_bpms, median_bpm};
pub use tracker::{SpectralFluxFactory, SpectralFluxTracker, TrackerConfig};
pub use traits::{TempoTracker, TrackerFactory};
pub use windowing::{window_sizes, window_sizes_for};
