//! Three horizontal meters for the low, mid and high ranges.

use super::{position, FrameInput, ModeKind, VisualMode};
use crate::color::ColorTier;
use crate::grid::FrameGrid;

/// Named range and its upper bound in Hz.
const RANGES: [(&str, f32); 3] = [("LOW", 250.0), ("MID", 4000.0), ("HIGH", f32::INFINITY)];

const LABEL_WIDTH: usize = 6;
const PERCENT_WIDTH: usize = 5;

pub struct Levels;

impl Levels {
    /// Mean energy per range. Without band centers the bands split in thirds.
    pub fn aggregate(spectrum: &[f32], centers: &[f32]) -> [f32; 3] {
        let mut sums = [0.0_f32; 3];
        let mut counts = [0_usize; 3];
        let n = spectrum.len();
        for (i, &v) in spectrum.iter().enumerate() {
            let range = match centers.get(i) {
                Some(&hz) if centers.len() == n => RANGES
                    .iter()
                    .position(|&(_, top)| hz < top)
                    .unwrap_or(RANGES.len() - 1),
                _ => (i * 3 / n.max(1)).min(2),
            };
            sums[range] += v;
            counts[range] += 1;
        }
        let mut out = [0.0; 3];
        for i in 0..3 {
            if counts[i] > 0 {
                out[i] = (sums[i] / counts[i] as f32).clamp(0.0, 1.0);
            }
        }
        out
    }
}

impl VisualMode for Levels {
    fn kind(&self) -> ModeKind {
        ModeKind::Levels
    }

    fn render(&mut self, input: &FrameInput<'_>, grid: &mut FrameGrid) {
        let (w, h) = (grid.width() as usize, grid.height() as usize);
        if w <= LABEL_WIDTH + PERCENT_WIDTH || h < 3 {
            return;
        }
        let levels = Self::aggregate(input.spectrum, input.band_centers);

        // meters with one blank row between them, block centered vertically
        let thickness = ((h - 2) / 3).clamp(1, 4);
        let block = thickness * 3 + 2;
        let top = (h.saturating_sub(block) / 2) as i32;
        let meter_w = w - LABEL_WIDTH - PERCENT_WIDTH;
        let filled = |level: f32| (level * meter_w as f32).round() as usize;

        for (m, (&(label, _), &level)) in RANGES.iter().zip(levels.iter()).enumerate() {
            let y0 = top + (m * (thickness + 1)) as i32;
            let label_y = y0 + (thickness / 2) as i32;
            grid.put_str(0, label_y, label, ColorTier::White);

            let fill = filled(level);
            for t in 0..thickness as i32 {
                for x in 0..meter_w {
                    let gx = (LABEL_WIDTH + x) as i32;
                    if x < fill {
                        let tier = input.scheme.tier(level, position(x, meter_w));
                        grid.set(gx, y0 + t, input.glyphs.block, tier);
                    } else {
                        grid.set(gx, y0 + t, input.glyphs.meter_empty, ColorTier::Dim);
                    }
                }
            }

            let pct = format!("{:>4}%", (level * 100.0).round() as u32);
            grid.put_str((w - PERCENT_WIDTH) as i32, label_y, &pct, ColorTier::White);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorScheme;
    use crate::grid::Glyphs;

    #[test]
    fn ranges_split_by_center_frequency() {
        let spectrum = [1.0, 0.5, 0.2, 0.0];
        let centers = [100.0, 1000.0, 3000.0, 9000.0];
        let levels = Levels::aggregate(&spectrum, &centers);
        assert_eq!(levels[0], 1.0);
        assert!((levels[1] - 0.35).abs() < 1e-6);
        assert_eq!(levels[2], 0.0);
    }

    #[test]
    fn without_centers_bands_split_in_thirds() {
        let spectrum = [0.3, 0.3, 0.6, 0.6, 0.9, 0.9];
        let levels = Levels::aggregate(&spectrum, &[]);
        assert!((levels[0] - 0.3).abs() < 1e-6);
        assert!((levels[2] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn meter_shows_label_and_percentage() {
        let spectrum = [0.5, 0.5, 0.5];
        let input = FrameInput {
            spectrum: &spectrum,
            peaks: &spectrum,
            waveform: &[],
            band_centers: &[100.0, 1000.0, 10000.0],
            elapsed: 0.0,
            dt: 0.016,
            scheme: ColorScheme::Green,
            glyphs: Glyphs::ASCII,
        };
        let mut grid = FrameGrid::new(31, 5);
        Levels.render(&input, &mut grid);
        assert_eq!(grid.row_text(0), "LOW   ##########..........  50%");
        assert!(grid.row_text(1).trim().is_empty());
        assert!(grid.row_text(2).starts_with("MID   #"));
        assert!(grid.row_text(4).starts_with("HIGH  #"));
    }
}
