//! Visualization modes.
//!
//! Each mode is a [`VisualMode`] that reads the shared smoothed spectrum,
//! peaks and waveform through a [`FrameInput`] and paints a [`FrameGrid`].
//! Per-mode animation state (particles, trails, rolling averages) lives
//! inside the mode value and is dropped with it on a mode switch.

pub mod bars;
pub mod circular_wave;
pub mod levels;
pub mod mirror;
pub mod particles;
pub mod radial_burst;
pub mod spectrum;
pub mod waveform;

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::color::{ColorScheme, ColorTier};
use crate::error::ParseNameError;
use crate::grid::{FrameGrid, Glyphs};

pub use bars::Bars;
pub use circular_wave::CircularWave;
pub use levels::Levels;
pub use mirror::MirrorCircular;
pub use particles::{Particle, ParticlePool};
pub use radial_burst::RadialBurst;
pub use spectrum::Spectrum;
pub use waveform::Waveform;

/// Smallest point count that keeps the circular outline gap-free.
pub const MIN_CIRCLE_POINTS: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    #[default]
    Bars,
    Spectrum,
    Waveform,
    MirrorCircular,
    CircularWave,
    Levels,
    RadialBurst,
}

impl ModeKind {
    /// Cycle order used by the mode key.
    pub const ALL: [ModeKind; 7] = [
        ModeKind::Bars,
        ModeKind::Spectrum,
        ModeKind::Waveform,
        ModeKind::MirrorCircular,
        ModeKind::CircularWave,
        ModeKind::Levels,
        ModeKind::RadialBurst,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModeKind::Bars => "bars",
            ModeKind::Spectrum => "spectrum",
            ModeKind::Waveform => "waveform",
            ModeKind::MirrorCircular => "mirror_circular",
            ModeKind::CircularWave => "circular_wave",
            ModeKind::Levels => "levels",
            ModeKind::RadialBurst => "radial_burst",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModeKind::Bars => "Bars",
            ModeKind::Spectrum => "Spectrum",
            ModeKind::Waveform => "Waveform",
            ModeKind::MirrorCircular => "Mirror",
            ModeKind::CircularWave => "Circular Wave",
            ModeKind::Levels => "Levels",
            ModeKind::RadialBurst => "Radial Burst",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Modes driven by the time-domain waveform get the calmer waveform
    /// smoothing constant.
    pub fn is_waveform_domain(self) -> bool {
        matches!(self, ModeKind::Waveform | ModeKind::CircularWave)
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModeKind {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| ParseNameError::new("mode", s, &Self::ALL.map(ModeKind::name)))
    }
}

/// Everything a mode may read for one tick.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// Smoothed band energies in [0, 1].
    pub spectrum: &'a [f32],
    /// Decaying per-band peaks in [0, 1].
    pub peaks: &'a [f32],
    /// Smoothed waveform in [-1, 1], one point per display column.
    pub waveform: &'a [f32],
    /// Center frequency of each band in Hz.
    pub band_centers: &'a [f32],
    /// Seconds since the engine started.
    pub elapsed: f32,
    /// Seconds since the previous tick.
    pub dt: f32,
    pub scheme: ColorScheme,
    pub glyphs: Glyphs,
}

impl FrameInput<'_> {
    /// Mean band energy.
    pub fn energy(&self) -> f32 {
        if self.spectrum.is_empty() {
            return 0.0;
        }
        self.spectrum.iter().sum::<f32>() / self.spectrum.len() as f32
    }
}

pub trait VisualMode: Send {
    fn kind(&self) -> ModeKind;

    /// Paint one frame onto `grid`, which arrives blank and sized to the
    /// display.
    fn render(&mut self, input: &FrameInput<'_>, grid: &mut FrameGrid);

    /// The display changed size. Modes holding size-derived state rebuild
    /// it here.
    fn resize(&mut self, _width: u16, _height: u16) {}

    /// Live particles, for modes that keep any.
    fn particle_count(&self) -> usize {
        0
    }
}

/// Construction parameters shared by all modes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeOptions {
    pub circle_points: usize,
    pub particle_capacity: usize,
    pub circle_overlays: bool,
    /// Fixed RNG seed for deterministic particles; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for ModeOptions {
    fn default() -> Self {
        Self {
            circle_points: 180,
            particle_capacity: 512,
            circle_overlays: true,
            seed: None,
        }
    }
}

impl ModeOptions {
    pub(crate) fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Fresh mode instance with empty animation state.
pub fn build(kind: ModeKind, options: &ModeOptions) -> Box<dyn VisualMode> {
    match kind {
        ModeKind::Bars => Box::new(Bars),
        ModeKind::Spectrum => Box::new(Spectrum),
        ModeKind::Waveform => Box::new(Waveform),
        ModeKind::MirrorCircular => Box::new(MirrorCircular),
        ModeKind::CircularWave => Box::new(CircularWave::new(options)),
        ModeKind::Levels => Box::new(Levels),
        ModeKind::RadialBurst => Box::new(RadialBurst::new(options)),
    }
}

/// Spread `values` over `width` columns. Wider displays repeat bands with the
/// remainder distributed evenly; narrower ones take the max of the bands
/// sharing a column.
pub fn column_values(values: &[f32], width: usize) -> Vec<f32> {
    let n = values.len();
    if n == 0 {
        return vec![0.0; width];
    }
    (0..width)
        .map(|c| {
            let lo = c * n / width;
            let hi = ((c + 1) * n / width).max(lo + 1).min(n);
            values[lo..hi].iter().copied().fold(0.0, f32::max)
        })
        .collect()
}

/// Column range `[start, end)` covered by item `i` of `count` across `width`.
pub fn span(i: usize, count: usize, width: usize) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }
    (i * width / count, (i + 1) * width / count)
}

/// Horizontal position of column `x` in [0, 1].
pub(crate) fn position(x: usize, width: usize) -> f32 {
    if width <= 1 {
        0.0
    } else {
        x as f32 / (width - 1) as f32
    }
}

/// Paint a vertical bar of `value` (0..=1) rows of `max_rows`, growing from
/// `base_y` in direction `dir` (-1 up, +1 down), with a fractional top.
#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_bar(
    grid: &mut FrameGrid,
    x: i32,
    base_y: i32,
    dir: i32,
    max_rows: usize,
    value: f32,
    tier: ColorTier,
    glyphs: &Glyphs,
) {
    let cells = value.clamp(0.0, 1.0) * max_rows as f32;
    let full = cells.floor() as usize;
    for r in 0..full.min(max_rows) {
        grid.set(x, base_y + dir * r as i32, glyphs.block, tier);
    }
    // downward bars have no inverted eighth blocks; round instead
    if full < max_rows {
        let frac = cells - full as f32;
        let top = if dir < 0 {
            glyphs.partial(frac)
        } else {
            (frac >= 0.5).then_some(glyphs.block)
        };
        if let Some(ch) = top {
            grid.set(x, base_y + dir * full as i32, ch, tier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_round_trip_through_from_str() {
        for kind in ModeKind::ALL {
            assert_eq!(kind.name().parse::<ModeKind>(), Ok(kind));
        }
        assert_eq!("radial-burst".parse::<ModeKind>(), Ok(ModeKind::RadialBurst));
        assert!("plasma".parse::<ModeKind>().is_err());
    }

    #[test]
    fn every_kind_builds_the_matching_mode() {
        let opts = ModeOptions::default();
        for kind in ModeKind::ALL {
            assert_eq!(build(kind, &opts).kind(), kind);
        }
    }

    #[test]
    fn column_values_spreads_and_folds() {
        assert_eq!(column_values(&[0.1, 0.9], 4), vec![0.1, 0.1, 0.9, 0.9]);
        assert_eq!(column_values(&[0.1, 0.9, 0.3, 0.2], 2), vec![0.9, 0.3]);
        assert_eq!(column_values(&[], 3), vec![0.0; 3]);
    }

    #[test]
    fn spans_cover_width_without_gaps() {
        let width = 83;
        let mut next = 0;
        for i in 0..64 {
            let (s, e) = span(i, 64, width);
            assert_eq!(s, next);
            assert!(e - s == 1 || e - s == 2);
            next = e;
        }
        assert_eq!(next, width);
    }
}
