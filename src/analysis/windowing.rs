//! Window and hop size policy
//!
//! A fixed table: the window depends only on whether the sample rate is at
//! least 44.1 kHz, and the hop is a fixed fraction of the window.

use crate::error::Result;
use crate::types::{AnalysisTask, WindowSizes};

/// Sample rate at and above which the larger window is used
pub const HIGH_RATE_THRESHOLD: u32 = 44_100;

/// Window and hop sizes for `task` at `sample_rate`
pub fn window_sizes(sample_rate: u32, task: AnalysisTask) -> WindowSizes {
    let high = sample_rate >= HIGH_RATE_THRESHOLD;
    let (window, divisor) = match task {
        AnalysisTask::Pitch => (if high { 4096 } else { 2048 }, 4),
        AnalysisTask::Onset => (if high { 1024 } else { 512 }, 2),
        AnalysisTask::Beat => (if high { 2048 } else { 1024 }, 2),
        AnalysisTask::Mfcc => (if high { 4096 } else { 2048 }, 4),
    };
    WindowSizes {
        window,
        hop: window / divisor,
    }
}

/// Like [`window_sizes`], with the task given by name
///
/// Fails with `UnknownTask` for names other than pitch, onset, beat, mfcc.
pub fn window_sizes_for(sample_rate: u32, task: &str) -> Result<WindowSizes> {
    Ok(window_sizes(sample_rate, task.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BpmTagError;

    fn sizes(window: usize, hop: usize) -> WindowSizes {
        WindowSizes { window, hop }
    }

    #[test]
    fn test_beat_sizes_by_rate() {
        for rate in [44_100, 48_000, 96_000, 192_000] {
            assert_eq!(window_sizes(rate, AnalysisTask::Beat), sizes(2048, 1024));
        }
        for rate in [8_000, 22_050, 32_000, 44_099] {
            assert_eq!(window_sizes(rate, AnalysisTask::Beat), sizes(1024, 512));
        }
    }

    #[test]
    fn test_full_table() {
        assert_eq!(window_sizes(44_100, AnalysisTask::Pitch), sizes(4096, 1024));
        assert_eq!(window_sizes(22_050, AnalysisTask::Pitch), sizes(2048, 512));
        assert_eq!(window_sizes(44_100, AnalysisTask::Onset), sizes(1024, 512));
        assert_eq!(window_sizes(22_050, AnalysisTask::Onset), sizes(512, 256));
        assert_eq!(window_sizes(48_000, AnalysisTask::Mfcc), sizes(4096, 1024));
        assert_eq!(window_sizes(16_000, AnalysisTask::Mfcc), sizes(2048, 512));
    }

    #[test]
    fn test_unknown_task_by_name() {
        assert_eq!(window_sizes_for(44_100, "beat").unwrap(), sizes(2048, 1024));
        assert!(matches!(
            window_sizes_for(44_100, "chroma"),
            Err(BpmTagError::UnknownTask(_))
        ));
    }
}
