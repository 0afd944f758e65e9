//! Spectral-flux beat tracker
//!
//! Keeps a rolling analysis frame of `window` samples that advances by one
//! hop per block. Each frame is Hann-windowed and transformed; the onset
//! strength is the mean half-wave rectified increase of log-compressed
//! magnitudes over the previous frame. A frame counts as a beat when its
//! strength is a local peak above an adaptive median + MAD threshold over
//! recent frames, and far enough from the previous beat.

use super::reduce::median;
use super::traits::{TempoTracker, TrackerFactory};
use crate::error::{BpmTagError, Result};
use crate::types::WindowSizes;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

/// Tuning for [`SpectralFluxTracker`]
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// MAD multiplier in the adaptive threshold
    pub threshold_k: f64,
    /// Absolute floor added to the adaptive threshold
    pub min_flux: f64,
    /// Seconds of onset history the threshold is computed over
    pub history_secs: f64,
    /// Fastest tempo reported; sets the minimum gap between beats
    pub max_bpm: f64,
    /// Gain applied before log compression of magnitudes
    pub compression: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            threshold_k: 1.5,
            min_flux: 0.02,
            history_secs: 2.0,
            max_bpm: 240.0,
            compression: 100.0,
        }
    }
}

/// Builds [`SpectralFluxTracker`]s
#[derive(Debug, Clone, Default)]
pub struct SpectralFluxFactory {
    config: TrackerConfig,
}

impl SpectralFluxFactory {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }
}

impl TrackerFactory for SpectralFluxFactory {
    fn create(&self, sizes: WindowSizes, sample_rate: u32) -> Result<Box<dyn TempoTracker>> {
        Ok(Box::new(SpectralFluxTracker::new(sizes, sample_rate, self.config)?))
    }

    fn name(&self) -> &'static str {
        "spectral-flux"
    }
}

/// Streaming spectral-flux onset tracker
pub struct SpectralFluxTracker {
    config: TrackerConfig,
    sizes: WindowSizes,
    sample_rate: u32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    frame: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    prev_log_mags: Vec<f32>,
    history: VecDeque<f64>,
    history_len: usize,
    /// Onset strength of the two most recent frames, oldest first
    recent: [f64; 2],
    frames: u64,
    last_beat: Option<f64>,
    min_gap: f64,
}

impl SpectralFluxTracker {
    pub fn new(sizes: WindowSizes, sample_rate: u32, config: TrackerConfig) -> Result<Self> {
        if sample_rate == 0 || sizes.hop == 0 || sizes.hop > sizes.window {
            return Err(BpmTagError::detector_error(
                PathBuf::new(),
                format!(
                    "Invalid tracker parameters: window {}, hop {}, {} Hz",
                    sizes.window, sizes.hop, sample_rate
                ),
            ));
        }

        let n = sizes.window;
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let window = (0..n)
            .map(|i| {
                let t = i as f32 / (n.max(2) - 1) as f32;
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * t).cos())
            })
            .collect();

        let frames_per_sec = sample_rate as f64 / sizes.hop as f64;
        let history_len = ((config.history_secs * frames_per_sec).round() as usize).max(3);

        Ok(Self {
            config,
            sizes,
            sample_rate,
            fft,
            window,
            frame: vec![0.0; n],
            spectrum: vec![Complex::new(0.0, 0.0); n],
            scratch,
            prev_log_mags: vec![0.0; n / 2 + 1],
            history: VecDeque::with_capacity(history_len),
            history_len,
            recent: [0.0; 2],
            frames: 0,
            last_beat: None,
            min_gap: 60.0 / config.max_bpm,
        })
    }

    /// Onset strength of the current frame
    fn onset_strength(&mut self) -> f64 {
        for ((bin, &sample), &w) in self
            .spectrum
            .iter_mut()
            .zip(self.frame.iter())
            .zip(self.window.iter())
        {
            *bin = Complex::new(sample * w, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let gain = self.config.compression;
        let mut rise = 0.0f64;
        for (bin, prev) in self.spectrum.iter().zip(self.prev_log_mags.iter_mut()) {
            let log_mag = (1.0 + gain * bin.norm()).ln();
            rise += (log_mag - *prev).max(0.0) as f64;
            *prev = log_mag;
        }
        rise / self.prev_log_mags.len() as f64
    }

    /// Adaptive threshold: median + k * MAD of recent onset strengths
    fn threshold(&self) -> f64 {
        let values: Vec<f64> = self.history.iter().copied().collect();
        let Some(center) = median(&values) else {
            return self.config.min_flux;
        };
        let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
        let mad = median(&deviations).unwrap_or(0.0);
        center + self.config.threshold_k * mad + self.config.min_flux
    }
}

impl TempoTracker for SpectralFluxTracker {
    fn process(&mut self, block: &[f32]) -> Result<Option<f64>> {
        let hop = self.sizes.hop;
        if block.len() != hop {
            return Err(BpmTagError::detector_error(
                PathBuf::new(),
                format!("Expected a block of {} samples, got {}", hop, block.len()),
            ));
        }

        let keep = self.sizes.window - hop;
        self.frame.copy_within(hop.., 0);
        self.frame[keep..].copy_from_slice(block);

        let strength = self.onset_strength();
        let index = self.frames;
        self.frames += 1;

        // The previous frame is a peak once the current one is lower
        let [before, candidate] = self.recent;
        let is_peak =
            index >= 1 && candidate > before && candidate >= strength && candidate > self.threshold();

        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(strength);
        self.recent = [candidate, strength];

        if !is_peak {
            return Ok(None);
        }

        let time = (index - 1) as f64 * hop as f64 / self.sample_rate as f64;
        match self.last_beat {
            Some(last) if time - last < self.min_gap => Ok(None),
            _ => {
                self.last_beat = Some(time);
                Ok(Some(time))
            }
        }
    }
}
