//! Differential renderer.
//!
//! Keeps the last frame that reached the display and, for each new frame,
//! writes only the cells whose glyph or tier changed, then flushes once.

use tracing::{debug, warn};

use crate::color::ColorTier;
use crate::error::SurfaceError;
use crate::grid::FrameGrid;

/// Grid-addressable display.
pub trait Surface {
    /// Current `(cols, rows)`.
    fn size(&self) -> Result<(u16, u16), SurfaceError>;

    /// Re-read the dimensions from the device at the start of a tick.
    /// Surfaces that cache their size override this; cell writes are then
    /// bounds-checked against the refreshed size.
    fn refresh_size(&mut self) -> Result<(u16, u16), SurfaceError> {
        self.size()
    }

    /// Blank the whole display. Called before a full redraw; on failure the
    /// renderer writes blank cells explicitly instead.
    fn clear(&mut self) -> Result<(), SurfaceError>;

    fn set_cell(&mut self, row: u16, col: u16, glyph: char, tier: ColorTier) -> Result<(), SurfaceError>;

    /// Push everything queued since the last flush to the display at once.
    fn flush(&mut self) -> Result<(), SurfaceError>;
}

/// What one `present` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub writes: usize,
    pub skipped: usize,
    /// Cells the surface refused.
    pub rejected: usize,
    pub full_redraw: bool,
}

#[derive(Debug, Default)]
pub struct DiffRenderer {
    previous: Option<FrameGrid>,
    frames: u64,
}

impl DiffRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the displayed frame; the next `present` redraws every cell.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Write the difference between `frame` and the previously presented
    /// frame, then flush. Rejected cells are skipped and counted; only a
    /// failed flush is returned as an error, after which the next frame is
    /// drawn in full.
    pub fn present<S: Surface + ?Sized>(
        &mut self,
        frame: &FrameGrid,
        surface: &mut S,
    ) -> Result<FrameStats, SurfaceError> {
        let mut stats = FrameStats::default();
        let previous = self
            .previous
            .as_ref()
            .filter(|prev| prev.size() == frame.size());

        let mut cleared = false;
        if previous.is_none() {
            stats.full_redraw = true;
            match surface.clear() {
                Ok(()) => cleared = true,
                Err(e) => warn!("surface clear failed, writing every cell: {}", e),
            }
        }

        for (row, col, cell) in frame.cells() {
            let unchanged = previous
                .and_then(|prev| prev.get(col as i32, row as i32))
                .is_some_and(|old| old == *cell);
            // after a clear, blank cells are already correct
            if unchanged || (cleared && cell.glyph == ' ') {
                stats.skipped += 1;
                continue;
            }
            match surface.set_cell(row, col, cell.glyph, cell.tier) {
                Ok(()) => stats.writes += 1,
                Err(e) => {
                    stats.rejected += 1;
                    debug!("cell ({}, {}) rejected: {}", row, col, e);
                }
            }
        }

        if stats.rejected > 0 {
            warn!(
                "surface rejected {} of {} cells this frame",
                stats.rejected,
                stats.writes + stats.rejected
            );
        }

        if let Err(e) = surface.flush() {
            self.previous = None;
            return Err(e);
        }

        // Rejected cells are recorded as displayed. A cell a terminal refuses
        // once (typically the bottom-right corner) it refuses every frame.
        match self.previous.as_mut() {
            Some(prev) => prev.clone_from(frame),
            None => self.previous = Some(frame.clone()),
        }
        self.frames += 1;
        Ok(stats)
    }
}
