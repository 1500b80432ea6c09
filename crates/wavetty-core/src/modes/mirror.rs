//! Mirrored bars: low bands meet in the middle of the screen, highs fan out
//! to both edges, and each bar grows up and down from the center row.

use super::{column_values, position, FrameInput, ModeKind, VisualMode};
use crate::grid::FrameGrid;

pub struct MirrorCircular;

impl VisualMode for MirrorCircular {
    fn kind(&self) -> ModeKind {
        ModeKind::MirrorCircular
    }

    fn render(&mut self, input: &FrameInput<'_>, grid: &mut FrameGrid) {
        let (w, h) = (grid.width() as i32, grid.height() as i32);
        if w < 2 || h == 0 || input.spectrum.is_empty() {
            return;
        }
        let half_w = (w / 2) as usize;
        let half_h = h / 2;
        let values = column_values(input.spectrum, half_w);

        for (i, &v) in values.iter().enumerate() {
            let rows = (v.clamp(0.0, 1.0) * half_h as f32).round() as i32;
            let tier = input.scheme.tier(v, position(i, half_w));
            let left = half_w as i32 - 1 - i as i32;
            let right = w - half_w as i32 + i as i32;
            for x in [left, right] {
                for r in 0..rows {
                    grid.set(x, half_h - 1 - r, input.glyphs.block, tier);
                    grid.set(x, h - half_h + r, input.glyphs.block, tier);
                }
            }
        }
    }
}
