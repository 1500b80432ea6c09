//! Classic frequency bars, one band per column span, growing from the bottom.

use super::{draw_bar, position, span, FrameInput, ModeKind, VisualMode};
use crate::grid::FrameGrid;

pub struct Bars;

impl VisualMode for Bars {
    fn kind(&self) -> ModeKind {
        ModeKind::Bars
    }

    fn render(&mut self, input: &FrameInput<'_>, grid: &mut FrameGrid) {
        let (w, h) = (grid.width() as usize, grid.height() as usize);
        let n = input.spectrum.len();
        if w == 0 || h == 0 || n == 0 {
            return;
        }

        if w < n {
            let cols = super::column_values(input.spectrum, w);
            for (x, &v) in cols.iter().enumerate() {
                let tier = input.scheme.tier(v, position(x, w));
                draw_bar(grid, x as i32, h as i32 - 1, -1, h, v, tier, &input.glyphs);
            }
            return;
        }

        for (i, &v) in input.spectrum.iter().enumerate() {
            let (start, end) = span(i, n, w);
            // leave a one-column gap once bars are wide enough to read as bars
            let end = if end - start >= 3 { end - 1 } else { end };
            let tier = input.scheme.tier(v, position(start, w));
            for x in start..end {
                draw_bar(grid, x as i32, h as i32 - 1, -1, h, v, tier, &input.glyphs);
            }
        }
    }
}
