//! Spectrum analyzer: one-column bars separated by gaps, each with a floating
//! peak marker from the shared peak track.

use super::{column_values, draw_bar, position, FrameInput, ModeKind, VisualMode};
use crate::grid::FrameGrid;

pub struct Spectrum;

impl VisualMode for Spectrum {
    fn kind(&self) -> ModeKind {
        ModeKind::Spectrum
    }

    fn render(&mut self, input: &FrameInput<'_>, grid: &mut FrameGrid) {
        let (w, h) = (grid.width() as usize, grid.height() as usize);
        if w == 0 || h == 0 || input.spectrum.is_empty() {
            return;
        }

        // one bar column plus one gap column per slot
        let slots = (w / 2).max(1);
        let values = column_values(input.spectrum, slots);
        let peaks = column_values(input.peaks, slots);
        let pad = (w - (slots * 2).min(w)) / 2;
        let bottom = h as i32 - 1;

        for (slot, (&v, &p)) in values.iter().zip(peaks.iter()).enumerate() {
            let x = (pad + slot * 2) as i32;
            let pos = position(slot, slots);
            let tier = input.scheme.tier(v, pos);
            draw_bar(grid, x, bottom, -1, h, v, tier, &input.glyphs);

            // the marker sits in the cell holding the peak height, above any
            // cell the bar (partial top included) reaches into
            let bar_cells = v.clamp(0.0, 1.0) * h as f32;
            let peak_cells = p.clamp(0.0, 1.0) * h as f32;
            let peak_row = (peak_cells.ceil() as usize).saturating_sub(1).min(h - 1);
            if peak_cells > bar_cells && peak_row as f32 >= bar_cells.ceil() {
                let tier = input.scheme.tier(p, pos);
                grid.set(x, bottom - peak_row as i32, input.glyphs.peak, tier);
            }
        }
    }
}
