//! Temporal and spatial smoothing of band energies, plus decaying peaks.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Temporal blend for frequency-domain modes. Higher is calmer.
    pub spectrum_alpha: f32,
    /// Temporal blend for waveform-domain modes.
    pub waveform_alpha: f32,
    /// Neighbor weight for the spatial pass, in [0, 1/3].
    pub spatial_weight: f32,
    /// Subtracted from every peak once per tick.
    pub peak_decay: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            spectrum_alpha: 0.6,
            waveform_alpha: 0.85,
            spatial_weight: 0.12,
            peak_decay: 0.02,
        }
    }
}

impl SmoothingConfig {
    pub const MAX_ALPHA: f32 = 0.99;

    pub fn sanitized(&self) -> (Self, Vec<String>) {
        let mut out = self.clone();
        let mut notes = Vec::new();
        let mut clamp = |name: &str, v: &mut f32, lo: f32, hi: f32| {
            let fixed = if v.is_finite() { v.clamp(lo, hi) } else { lo };
            if fixed != *v {
                notes.push(format!("smoothing.{} {} -> {}", name, v, fixed));
                *v = fixed;
            }
        };
        clamp("spectrum_alpha", &mut out.spectrum_alpha, 0.0, Self::MAX_ALPHA);
        clamp("waveform_alpha", &mut out.waveform_alpha, 0.0, Self::MAX_ALPHA);
        clamp("spatial_weight", &mut out.spatial_weight, 0.0, 1.0 / 3.0);
        clamp("peak_decay", &mut out.peak_decay, 0.001, 1.0);
        (out, notes)
    }
}

/// Owns the smoothed spectrum, peak track and smoothed waveform.
///
/// Modes only ever read from it. State survives mode and color changes and
/// is reset when the band count changes.
#[derive(Debug, Clone, Default)]
pub struct SpectrumSmoother {
    spatial_weight: f32,
    peak_decay: f32,
    temporal: Vec<f32>,
    smoothed: Vec<f32>,
    peaks: Vec<f32>,
    waveform: Vec<f32>,
}

impl SpectrumSmoother {
    pub fn new(bands: usize, config: &SmoothingConfig) -> Self {
        Self {
            spatial_weight: config.spatial_weight.clamp(0.0, 1.0 / 3.0),
            peak_decay: config.peak_decay.max(0.0),
            temporal: vec![0.0; bands],
            smoothed: vec![0.0; bands],
            peaks: vec![0.0; bands],
            waveform: Vec::new(),
        }
    }

    pub fn bands(&self) -> usize {
        self.temporal.len()
    }

    /// Temporally and spatially smoothed spectrum.
    pub fn smoothed(&self) -> &[f32] {
        &self.smoothed
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn waveform(&self) -> &[f32] {
        &self.waveform
    }

    pub fn reset(&mut self) {
        self.temporal.iter_mut().for_each(|v| *v = 0.0);
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
        self.peaks.iter_mut().for_each(|v| *v = 0.0);
        self.waveform.clear();
    }

    /// Change the band count. A structural change, so all state is dropped.
    pub fn resize(&mut self, bands: usize) {
        if bands == self.bands() {
            return;
        }
        debug!("smoother resized {} -> {} bands", self.bands(), bands);
        self.temporal = vec![0.0; bands];
        self.smoothed = vec![0.0; bands];
        self.peaks = vec![0.0; bands];
        self.waveform.clear();
    }

    /// Fold one raw spectrum into the state.
    ///
    /// `temporal = α·temporal + (1-α)·raw`, then a three-tap neighbor blend
    /// with replicated edges. Peaks follow the raw value up and fall by the
    /// decay rate otherwise.
    pub fn update(&mut self, raw: &[f32], alpha: f32) {
        if raw.len() != self.bands() {
            self.resize(raw.len());
        }
        let alpha = alpha.clamp(0.0, SmoothingConfig::MAX_ALPHA);

        for (t, &r) in self.temporal.iter_mut().zip(raw) {
            *t = alpha * *t + (1.0 - alpha) * r;
        }

        let w = self.spatial_weight;
        let n = self.temporal.len();
        for i in 0..n {
            let left = self.temporal[i.saturating_sub(1)];
            let right = self.temporal[(i + 1).min(n - 1)];
            self.smoothed[i] = (1.0 - 2.0 * w) * self.temporal[i] + w * (left + right);
        }

        for (p, &r) in self.peaks.iter_mut().zip(raw) {
            *p = r.max(*p - self.peak_decay).max(0.0);
        }
    }

    /// Temporal smoothing of the waveform snapshot. A length change (terminal
    /// resize) restarts from the new snapshot.
    pub fn update_waveform(&mut self, points: &[f32], alpha: f32) {
        if self.waveform.len() != points.len() {
            self.waveform = points.to_vec();
            return;
        }
        let alpha = alpha.clamp(0.0, SmoothingConfig::MAX_ALPHA);
        for (w, &p) in self.waveform.iter_mut().zip(points) {
            *w = alpha * *w + (1.0 - alpha) * p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_converges_for_any_alpha() {
        for alpha in [0.0, 0.3, 0.6, 0.85, 0.95] {
            let mut s = SpectrumSmoother::new(8, &SmoothingConfig::default());
            let raw = vec![0.7; 8];
            for _ in 0..2000 {
                s.update(&raw, alpha);
            }
            for &v in s.smoothed() {
                assert!((v - 0.7).abs() < 1e-3, "alpha {alpha}: {v}");
            }
        }
    }

    #[test]
    fn peaks_decay_monotonically_after_transient() {
        let mut s = SpectrumSmoother::new(4, &SmoothingConfig::default());
        s.update(&[1.0, 0.5, 0.0, 0.2], 0.6);
        let mut last = s.peaks().to_vec();
        assert_eq!(last, vec![1.0, 0.5, 0.0, 0.2]);
        for _ in 0..100 {
            s.update(&[0.0; 4], 0.6);
            for (now, before) in s.peaks().iter().zip(&last) {
                assert!(now <= before);
            }
            last = s.peaks().to_vec();
        }
        assert!(last.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn spatial_pass_spreads_single_spike() {
        let cfg = SmoothingConfig {
            spatial_weight: 0.25,
            ..SmoothingConfig::default()
        };
        let mut s = SpectrumSmoother::new(5, &cfg);
        s.update(&[0.0, 0.0, 1.0, 0.0, 0.0], 0.0);
        let out = s.smoothed();
        assert!((out[2] - 0.5).abs() < 1e-6);
        assert!((out[1] - 0.25).abs() < 1e-6);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn band_count_change_resets_state() {
        let mut s = SpectrumSmoother::new(4, &SmoothingConfig::default());
        s.update(&[1.0; 4], 0.5);
        s.update(&[0.0; 6], 0.5);
        assert_eq!(s.bands(), 6);
        assert!(s.peaks().iter().all(|&p| p == 0.0));
    }

    #[test]
    fn waveform_smoothing_restarts_on_resize() {
        let mut s = SpectrumSmoother::new(4, &SmoothingConfig::default());
        s.update_waveform(&[1.0, -1.0], 0.85);
        s.update_waveform(&[0.0, 0.0], 0.5);
        assert_eq!(s.waveform(), &[0.5, -0.5]);
        s.update_waveform(&[0.2, 0.2, 0.2], 0.5);
        assert_eq!(s.waveform(), &[0.2, 0.2, 0.2]);
    }

    #[test]
    fn sanitize_clamps_alpha() {
        let cfg = SmoothingConfig {
            spectrum_alpha: 1.5,
            ..SmoothingConfig::default()
        };
        let (fixed, notes) = cfg.sanitized();
        assert_eq!(fixed.spectrum_alpha, 0.99);
        assert_eq!(notes.len(), 1);
    }
}
