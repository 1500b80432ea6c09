//! Spectral analyzer. Turns a sample window into log-spaced band energies
//! and a decimated waveform.
//!
//! Per tick:
//! 1. Hann-window the newest `fft_size` samples (zero padded) and take the
//!    magnitude spectrum.
//! 2. Average the bins inside each log-spaced band; bands too narrow to hold a
//!    bin interpolate the spectrum at their center frequency instead.
//! 3. Tilt compensation: fixed gain rising with band index.
//! 4. Noise floor: subtract a constant, clamp at zero.
//! 5. Adaptive EQ (optional): divide out each band's slow running mean,
//!    blended in by the EQ strength.
//! 6. Power curve (`x^gamma`) to lift quiet content.
//! 7. Normalize by a decaying tracked maximum (or a fixed one), guarded by a
//!    minimum denominator.
//!
//! With EQ off and fixed normalization the analyzer holds no state between
//! ticks: the same window always yields the same bands.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ParseNameError;
use crate::sample_buffer::SampleWindow;

pub const MIN_BANDS: usize = 4;
pub const MAX_BANDS: usize = 256;
pub const MIN_FFT_SIZE: usize = 512;
pub const MAX_FFT_SIZE: usize = 16384;

// ═════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═════════════════════════════════════════════════════════════════════════════

/// Adaptive EQ strength, cycled from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqStrength {
    Off,
    #[default]
    Medium,
    Strong,
}

impl EqStrength {
    pub const ALL: [EqStrength; 3] = [EqStrength::Off, EqStrength::Medium, EqStrength::Strong];

    pub fn next(self) -> Self {
        match self {
            EqStrength::Off => EqStrength::Medium,
            EqStrength::Medium => EqStrength::Strong,
            EqStrength::Strong => EqStrength::Off,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EqStrength::Off => "off",
            EqStrength::Medium => "medium",
            EqStrength::Strong => "strong",
        }
    }

    pub fn is_enabled(self) -> bool {
        self != EqStrength::Off
    }
}

impl fmt::Display for EqStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EqStrength {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.name() == wanted)
            .ok_or_else(|| ParseNameError::new("eq strength", s, &Self::ALL.map(EqStrength::name)))
    }
}

/// How band values are scaled into [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Divide by the loudest recent frame, decaying by `normalize_decay`.
    #[default]
    Adaptive,
    /// Divide by `fixed_max`; no history.
    Fixed,
}

/// Analyzer geometry plus the tunable DSP constants.
///
/// The constants are exposed rather than hard-coded; the defaults were
/// picked by ear against real program material, not derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Number of log-spaced bands (N).
    pub bands: usize,
    /// FFT length; also the number of samples the analyzer reads per tick.
    pub fft_size: usize,
    pub low_hz: f32,
    pub high_hz: f32,
    /// Gain added at the top band: `1 + tilt_strength * (i/(N-1))^tilt_exponent`.
    pub tilt_strength: f32,
    pub tilt_exponent: f32,
    /// Linear magnitude subtracted from every band after tilt.
    pub noise_floor: f32,
    /// Running-mean blend weight per tick for adaptive EQ.
    pub eq_blend: f32,
    pub eq_medium: f32,
    pub eq_strong: f32,
    /// Dynamic range compression exponent.
    pub gamma: f32,
    pub normalization: Normalization,
    /// Per-tick decay of the tracked normalization maximum.
    pub normalize_decay: f32,
    /// Denominator for [`Normalization::Fixed`], in post-gamma units.
    pub fixed_max: f32,
    pub min_denominator: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            bands: 64,
            fft_size: 2048,
            low_hz: 20.0,
            high_hz: 20000.0,
            tilt_strength: 0.78,
            tilt_exponent: 1.15,
            noise_floor: 0.008,
            eq_blend: 0.02,
            eq_medium: 0.4,
            eq_strong: 0.65,
            gamma: 0.6,
            normalization: Normalization::Adaptive,
            normalize_decay: 0.995,
            fixed_max: 1.0,
            min_denominator: 0.05,
        }
    }
}

impl AnalyzerConfig {
    /// Clamp inconsistent values. Returns the fixed config and a description
    /// of every adjustment so the caller can log them.
    pub fn sanitized(&self) -> (Self, Vec<String>) {
        let mut out = self.clone();
        let mut notes = Vec::new();

        let fft = self
            .fft_size
            .clamp(MIN_FFT_SIZE, MAX_FFT_SIZE)
            .next_power_of_two()
            .min(MAX_FFT_SIZE);
        if fft != self.fft_size {
            notes.push(format!("analyzer.fft_size {} -> {}", self.fft_size, fft));
            out.fft_size = fft;
        }

        // More bands than a quarter of the bins leaves most bands interpolated.
        let max_bands = (out.fft_size / 4).min(MAX_BANDS);
        let bands = self.bands.clamp(MIN_BANDS, max_bands);
        if bands != self.bands {
            notes.push(format!("analyzer.bands {} -> {}", self.bands, bands));
            out.bands = bands;
        }

        if !(self.low_hz > 0.0 && self.low_hz < self.high_hz) {
            let d = AnalyzerConfig::default();
            notes.push(format!(
                "analyzer.low_hz/high_hz {}/{} -> {}/{}",
                self.low_hz, self.high_hz, d.low_hz, d.high_hz
            ));
            out.low_hz = d.low_hz;
            out.high_hz = d.high_hz;
        }

        let mut clamp = |name: &str, v: &mut f32, lo: f32, hi: f32| {
            let fixed = if v.is_finite() { v.clamp(lo, hi) } else { lo };
            if fixed != *v {
                notes.push(format!("analyzer.{} {} -> {}", name, v, fixed));
                *v = fixed;
            }
        };
        clamp("tilt_strength", &mut out.tilt_strength, 0.0, 4.0);
        clamp("tilt_exponent", &mut out.tilt_exponent, 0.1, 4.0);
        clamp("noise_floor", &mut out.noise_floor, 0.0, 0.5);
        clamp("eq_blend", &mut out.eq_blend, 0.0001, 1.0);
        clamp("eq_medium", &mut out.eq_medium, 0.0, 1.0);
        clamp("eq_strong", &mut out.eq_strong, 0.0, 1.0);
        clamp("gamma", &mut out.gamma, 0.2, 1.0);
        clamp("normalize_decay", &mut out.normalize_decay, 0.0, 0.9999);
        clamp("fixed_max", &mut out.fixed_max, 1e-4, 10.0);
        clamp("min_denominator", &mut out.min_denominator, 1e-4, 10.0);

        (out, notes)
    }

    pub fn eq_amount(&self, strength: EqStrength) -> f32 {
        match strength {
            EqStrength::Off => 0.0,
            EqStrength::Medium => self.eq_medium,
            EqStrength::Strong => self.eq_strong,
        }
    }

    /// Shortest window the analyzer accepts; anything shorter is silence.
    pub fn min_window(&self) -> usize {
        self.fft_size / 2
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// BAND LAYOUT
// ═════════════════════════════════════════════════════════════════════════════

/// Log-spaced band boundaries: edge `i` is `low * (high/low)^(i/N)`, with the
/// top edge clamped to Nyquist.
#[derive(Debug, Clone, PartialEq)]
pub struct BandLayout {
    edges: Vec<f32>,
    centers: Vec<f32>,
    sample_rate: u32,
}

impl BandLayout {
    pub fn new(bands: usize, low_hz: f32, high_hz: f32, sample_rate: u32) -> Self {
        let bands = bands.max(1);
        let nyquist = sample_rate.max(2) as f64 / 2.0;
        let high = (high_hz as f64).min(nyquist);
        let low = if low_hz > 0.0 && (low_hz as f64) < high {
            low_hz as f64
        } else {
            high / 1000.0
        };
        let ratio = high / low;

        let mut edges: Vec<f32> = (0..=bands)
            .map(|i| (low * ratio.powf(i as f64 / bands as f64)) as f32)
            .collect();
        edges[bands] = high as f32;

        let centers = edges.windows(2).map(|e| (e[0] * e[1]).sqrt()).collect();

        Self {
            edges,
            centers,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// N + 1 monotonically increasing boundaries in Hz.
    pub fn edges(&self) -> &[f32] {
        &self.edges
    }

    /// Geometric center of each band in Hz.
    pub fn centers(&self) -> &[f32] {
        &self.centers
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn range(&self, band: usize) -> Option<(f32, f32)> {
        Some((*self.edges.get(band)?, *self.edges.get(band + 1)?))
    }

    /// Band whose `[lo, hi)` range holds `freq`.
    pub fn band_for(&self, freq: f32) -> Option<usize> {
        if freq < self.edges[0] || freq >= self.edges[self.edges.len() - 1] {
            return None;
        }
        Some(self.edges.partition_point(|&e| e <= freq) - 1)
    }
}

/// How a band reads the magnitude spectrum, resolved once per layout.
#[derive(Debug, Clone, Copy, PartialEq)]
enum BinSource {
    /// Mean of bins `lo..hi`.
    Mean { lo: usize, hi: usize },
    /// Linear interpolation between bin `idx` and `idx + 1`.
    Interp { idx: usize, frac: f32 },
}

fn resolve_bins(layout: &BandLayout, fft_size: usize) -> Vec<BinSource> {
    let bin_hz = layout.sample_rate() as f32 / fft_size as f32;
    let last_bin = fft_size / 2;
    (0..layout.len())
        .map(|band| {
            let (lo_hz, hi_hz) = layout.range(band).unwrap_or((0.0, 0.0));
            let lo = ((lo_hz / bin_hz).ceil() as usize).min(last_bin + 1);
            let hi = ((hi_hz / bin_hz).ceil() as usize).min(last_bin + 1);
            if lo < hi {
                BinSource::Mean { lo, hi }
            } else {
                let pos = (layout.centers()[band] / bin_hz).min(last_bin as f32);
                let idx = (pos.floor() as usize).min(last_bin.saturating_sub(1));
                BinSource::Interp {
                    idx,
                    frac: (pos - idx as f32).clamp(0.0, 1.0),
                }
            }
        })
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═════════════════════════════════════════════════════════════════════════════

/// N non-negative band energies, normalized to [0, 1].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandSpectrum {
    pub values: Vec<f32>,
}

impl BandSpectrum {
    pub fn zeros(bands: usize) -> Self {
        Self {
            values: vec![0.0; bands],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// Index of the loudest band.
    pub fn argmax(&self) -> Option<usize> {
        self.values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

/// Raw samples decimated to a display-sized number of points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WaveformSnapshot {
    pub points: Vec<f32>,
}

impl WaveformSnapshot {
    /// Pick every `len/points`-th sample from the newest span; shorter input
    /// is zero padded at the end.
    pub fn decimate(samples: &[f32], points: usize) -> Self {
        if points == 0 {
            return Self::default();
        }
        if samples.len() < points {
            let mut out = samples.to_vec();
            out.resize(points, 0.0);
            return Self { points: out };
        }
        let step = samples.len() / points;
        let start = samples.len() - step * points;
        Self {
            points: (0..points).map(|i| samples[start + i * step]).collect(),
        }
    }

    pub fn zeros(points: usize) -> Self {
        Self {
            points: vec![0.0; points],
        }
    }
}

/// Resample `values` to `n` points by linear interpolation.
pub fn resample(values: &[f32], n: usize) -> Vec<f32> {
    match values.len() {
        0 => vec![0.0; n],
        1 => vec![values[0]; n],
        len => (0..n)
            .map(|i| {
                let pos = if n > 1 {
                    i as f32 * (len - 1) as f32 / (n - 1) as f32
                } else {
                    0.0
                };
                let idx = (pos.floor() as usize).min(len - 2);
                let t = pos - idx as f32;
                values[idx] * (1.0 - t) + values[idx + 1] * t
            })
            .collect(),
    }
}

/// One tick's analyzer output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Analysis {
    pub bands: BandSpectrum,
    pub waveform: WaveformSnapshot,
}

// ═════════════════════════════════════════════════════════════════════════════
// ADAPTIVE EQ
// ═════════════════════════════════════════════════════════════════════════════

/// Slow per-band running mean used by adaptive EQ.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EqState {
    mean: Vec<f32>,
}

impl EqState {
    pub fn reset(&mut self) {
        self.mean.clear();
    }

    pub fn running_mean(&self) -> &[f32] {
        &self.mean
    }

    /// Update the running mean, then pull each band toward the cross-band
    /// average level by `amount`. Bands sitting persistently above average
    /// are attenuated, persistently quiet bands lifted; a band's deviation
    /// from its own mean (the transient) passes through. Zero stays zero.
    pub fn apply(&mut self, values: &mut [f32], blend: f32, amount: f32) {
        if self.mean.len() != values.len() {
            self.mean = values.to_vec();
        } else {
            for (m, &v) in self.mean.iter_mut().zip(values.iter()) {
                *m = (1.0 - blend) * *m + blend * v;
            }
        }

        let overall = self.mean.iter().sum::<f32>() / self.mean.len().max(1) as f32;
        if overall <= f32::EPSILON || amount <= 0.0 {
            return;
        }
        for (v, &m) in values.iter_mut().zip(self.mean.iter()) {
            let gain = (overall / m.max(overall * 0.05)).clamp(0.25, 4.0);
            *v *= (1.0 - amount) + amount * gain;
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// ANALYZER
// ═════════════════════════════════════════════════════════════════════════════

pub struct SpectralAnalyzer {
    config: AnalyzerConfig,
    layout: BandLayout,
    bins: Vec<BinSource>,
    tilt: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
    hann: Vec<f32>,
    eq: EqState,
    eq_strength: EqStrength,
    norm_peak: f32,
}

impl SpectralAnalyzer {
    /// Build an analyzer; `config` is sanitized first.
    pub fn new(config: &AnalyzerConfig, sample_rate: u32) -> Self {
        let (config, notes) = config.sanitized();
        for note in notes {
            info!("clamped {}", note);
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let layout = BandLayout::new(config.bands, config.low_hz, config.high_hz, sample_rate);
        let bins = resolve_bins(&layout, config.fft_size);
        let tilt = tilt_curve(config.bands, config.tilt_strength, config.tilt_exponent);

        debug!(
            "analyzer: {} bands {:.1}..{:.1} Hz, fft {}, {} Hz",
            layout.len(),
            layout.edges()[0],
            layout.edges()[layout.len()],
            config.fft_size,
            sample_rate
        );

        Self {
            buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
            magnitudes: vec![0.0; config.fft_size / 2 + 1],
            config,
            layout,
            bins,
            tilt,
            fft,
            scratch,
            hann: Vec::new(),
            eq: EqState::default(),
            eq_strength: EqStrength::Off,
            norm_peak: 0.0,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    pub fn bands(&self) -> usize {
        self.layout.len()
    }

    pub fn eq_state(&self) -> &EqState {
        &self.eq
    }

    /// Samples to request from the buffer each tick.
    pub fn window_len(&self) -> usize {
        self.config.fft_size
    }

    /// Forget the adaptive EQ history (explicit user toggle).
    pub fn reset_eq(&mut self) {
        self.eq.reset();
    }

    /// Forget the tracked normalization maximum.
    pub fn reset_normalization(&mut self) {
        self.norm_peak = 0.0;
    }

    /// Analyze one window. `wave_points` sizes the waveform snapshot.
    pub fn analyze(&mut self, window: &SampleWindow, eq: EqStrength, wave_points: usize) -> Analysis {
        if eq != self.eq_strength {
            debug!("adaptive eq {} -> {}, resetting running mean", self.eq_strength, eq);
            self.eq.reset();
            self.eq_strength = eq;
        }
        if window.sample_rate != self.layout.sample_rate() && window.sample_rate > 0 {
            self.rebuild_layout(window.sample_rate);
        }

        let n = window.len().min(self.config.fft_size);
        if n < self.config.min_window() {
            return Analysis {
                bands: BandSpectrum::zeros(self.bands()),
                waveform: WaveformSnapshot::zeros(wave_points),
            };
        }
        let tail = &window.samples[window.len() - n..];

        self.magnitude_spectrum(tail);
        let mut values = self.band_values();

        for (v, g) in values.iter_mut().zip(self.tilt.iter()) {
            *v = (*v * g - self.config.noise_floor).max(0.0);
        }

        if eq.is_enabled() {
            let amount = self.config.eq_amount(eq);
            self.eq.apply(&mut values, self.config.eq_blend, amount);
        }

        let gamma = self.config.gamma;
        let mut frame_max = 0.0_f32;
        for v in values.iter_mut() {
            *v = v.powf(gamma);
            frame_max = frame_max.max(*v);
        }
        let denom = match self.config.normalization {
            Normalization::Adaptive => {
                self.norm_peak = frame_max.max(self.norm_peak * self.config.normalize_decay);
                self.norm_peak
            }
            Normalization::Fixed => self.config.fixed_max,
        }
        .max(self.config.min_denominator);
        for v in values.iter_mut() {
            *v = (*v / denom).clamp(0.0, 1.0);
        }

        Analysis {
            bands: BandSpectrum { values },
            waveform: WaveformSnapshot::decimate(tail, wave_points),
        }
    }

    fn rebuild_layout(&mut self, sample_rate: u32) {
        info!(
            "analyzer sample rate {} -> {} Hz",
            self.layout.sample_rate(),
            sample_rate
        );
        self.layout = BandLayout::new(
            self.config.bands,
            self.config.low_hz,
            self.config.high_hz,
            sample_rate,
        );
        self.bins = resolve_bins(&self.layout, self.config.fft_size);
    }

    /// Fill `self.magnitudes` with amplitude-calibrated bin magnitudes: a
    /// full-scale sine centered on a bin reads ~1.0.
    fn magnitude_spectrum(&mut self, samples: &[f32]) {
        let n = samples.len();
        if self.hann.len() != n {
            self.hann = hann(n);
        }
        let window_sum: f32 = self.hann.iter().sum::<f32>().max(f32::EPSILON);

        for (slot, (s, w)) in self.buffer.iter_mut().zip(samples.iter().zip(self.hann.iter())) {
            *slot = Complex::new(s * w, 0.0);
        }
        for slot in self.buffer.iter_mut().skip(n) {
            *slot = Complex::new(0.0, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 2.0 / window_sum;
        for (m, c) in self.magnitudes.iter_mut().zip(self.buffer.iter()) {
            *m = c.norm() * scale;
        }
    }

    fn band_values(&self) -> Vec<f32> {
        let mags = &self.magnitudes;
        self.bins
            .iter()
            .map(|src| match *src {
                BinSource::Mean { lo, hi } => {
                    let hi = hi.min(mags.len());
                    if lo >= hi {
                        return 0.0;
                    }
                    mags[lo..hi].iter().sum::<f32>() / (hi - lo) as f32
                }
                BinSource::Interp { idx, frac } => {
                    let a = mags.get(idx).copied().unwrap_or(0.0);
                    let b = mags.get(idx + 1).copied().unwrap_or(a);
                    a * (1.0 - frac) + b * frac
                }
            })
            .collect()
    }
}

/// Hann window of length `n`.
pub fn hann(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos())
        })
        .collect()
}

/// Monotonically increasing gain per band index.
pub fn tilt_curve(bands: usize, strength: f32, exponent: f32) -> Vec<f32> {
    let denom = bands.saturating_sub(1).max(1) as f32;
    (0..bands)
        .map(|i| 1.0 + strength * (i as f32 / denom).powf(exponent))
        .collect()
}
