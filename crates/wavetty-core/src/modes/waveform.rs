//! Oscilloscope line around a horizontal center axis.
//!
//! Each column draws a vertical run from the previous column's row to its
//! own, so the trace stays continuous however steep the signal is.

use super::{FrameInput, ModeKind, VisualMode};
use crate::analyzer::resample;
use crate::color::ColorTier;
use crate::grid::FrameGrid;

/// Below this peak the trace is not stretched to full height, so silence
/// stays flat instead of amplifying noise.
const MIN_NORMALIZE: f32 = 0.05;

pub struct Waveform;

impl VisualMode for Waveform {
    fn kind(&self) -> ModeKind {
        ModeKind::Waveform
    }

    fn render(&mut self, input: &FrameInput<'_>, grid: &mut FrameGrid) {
        let (w, h) = (grid.width() as usize, grid.height() as i32);
        if w == 0 || h == 0 {
            return;
        }
        let points = if input.waveform.len() == w {
            input.waveform.to_vec()
        } else {
            resample(input.waveform, w)
        };
        let peak = points.iter().fold(0.0_f32, |m, v| m.max(v.abs()));
        let scale = 1.0 / peak.max(MIN_NORMALIZE);

        let middle = h / 2;
        let amplitude = (middle - 1).max(0) as f32;
        let mut prev: Option<i32> = None;
        for (x, &v) in points.iter().enumerate() {
            let v = (v * scale).clamp(-1.0, 1.0);
            let row = (middle - (v * amplitude).round() as i32).clamp(0, h - 1);
            let tier = input.scheme.tier(v.abs(), 0.0);
            let from = prev.unwrap_or(row);
            let (lo, hi) = (from.min(row), from.max(row));
            let glyph = if lo == hi {
                input.glyphs.wave_flat
            } else {
                input.glyphs.wave_vertical
            };
            for y in lo..=hi {
                grid.set(x as i32, y, glyph, tier);
            }
            prev = Some(row);
        }

        for x in 0..w as i32 {
            grid.set_if_blank(x, middle, input.glyphs.axis, ColorTier::Dim);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorScheme;
    use crate::grid::Glyphs;

    fn render(wave: &[f32], w: u16, h: u16) -> FrameGrid {
        let input = FrameInput {
            spectrum: &[],
            peaks: &[],
            waveform: wave,
            band_centers: &[],
            elapsed: 0.0,
            dt: 0.016,
            scheme: ColorScheme::Blue,
            glyphs: Glyphs::UNICODE,
        };
        let mut grid = FrameGrid::new(w, h);
        Waveform.render(&input, &mut grid);
        grid
    }

    #[test]
    fn trace_is_continuous_between_columns() {
        let wave: Vec<f32> = (0..40).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let grid = render(&wave, 40, 21);
        let rows = |x: i32| -> Vec<i32> {
            (0..21)
                .filter(|&y| {
                    let c = grid.get(x, y).unwrap();
                    c.glyph != ' ' && c.tier != ColorTier::Dim
                })
                .collect()
        };
        for x in 1..40 {
            let (a, b) = (rows(x - 1), rows(x));
            assert!(!b.is_empty());
            // some cell of column x touches some cell of column x-1
            assert!(b.iter().any(|y| a.iter().any(|p| (p - y).abs() <= 1)), "gap at column {x}");
        }
    }

    #[test]
    fn silence_draws_flat_line_on_axis() {
        let grid = render(&[0.0; 10], 10, 9);
        assert_eq!(grid.row_text(4), "──────────");
        assert_eq!(grid.count_non_blank(), 10);
    }
}
