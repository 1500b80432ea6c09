//! Frame grid: one tick's worth of resolved cells, plus the glyph palettes
//! modes draw with.

use crate::color::ColorTier;

/// One terminal position's glyph and color tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderCell {
    pub glyph: char,
    pub tier: ColorTier,
}

impl RenderCell {
    pub const BLANK: Self = Self {
        glyph: ' ',
        tier: ColorTier::Dim,
    };

    pub const fn new(glyph: char, tier: ColorTier) -> Self {
        Self { glyph, tier }
    }
}

impl Default for RenderCell {
    fn default() -> Self {
        Self::BLANK
    }
}

/// Row-major grid of [`RenderCell`]s. Writes outside the grid are ignored,
/// so mode code can plot freely without its own bounds checks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameGrid {
    width: u16,
    height: u16,
    cells: Vec<RenderCell>,
}

impl FrameGrid {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![RenderCell::BLANK; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Resize and blank. No-op (beyond blanking) if the size is unchanged.
    pub fn resize(&mut self, width: u16, height: u16) {
        if (width, height) != (self.width, self.height) {
            self.width = width;
            self.height = height;
            self.cells = vec![RenderCell::BLANK; width as usize * height as usize];
        } else {
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(RenderCell::BLANK);
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<RenderCell> {
        self.index(x, y).map(|i| self.cells[i])
    }

    pub fn set(&mut self, x: i32, y: i32, glyph: char, tier: ColorTier) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = RenderCell::new(glyph, tier);
        }
    }

    /// Write only where the cell is still blank.
    pub fn set_if_blank(&mut self, x: i32, y: i32, glyph: char, tier: ColorTier) {
        if let Some(i) = self.index(x, y) {
            if self.cells[i].glyph == ' ' {
                self.cells[i] = RenderCell::new(glyph, tier);
            }
        }
    }

    pub fn put_str(&mut self, x: i32, y: i32, text: &str, tier: ColorTier) {
        for (i, ch) in text.chars().enumerate() {
            self.set(x + i as i32, y, ch, tier);
        }
    }

    /// Fill the half-open rectangle `[x0, x1) × [y0, y1)`.
    pub fn fill(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, glyph: char, tier: ColorTier) {
        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(self.width as i32);
        let y1 = y1.min(self.height as i32);
        for y in y0..y1 {
            for x in x0..x1 {
                self.set(x, y, glyph, tier);
            }
        }
    }

    /// Bresenham line, inclusive of both endpoints. Consecutive plotted
    /// cells are always 8-neighbors.
    pub fn line(&mut self, from: (i32, i32), to: (i32, i32), glyph: char, tier: ColorTier) {
        for (x, y) in line_points(from, to) {
            self.set(x, y, glyph, tier);
        }
    }

    /// `(row, col, cell)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u16, u16, &RenderCell)> + '_ {
        let width = self.width.max(1) as usize;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| ((i / width) as u16, (i % width) as u16, c))
    }

    /// Row as a string, for tests and debugging.
    pub fn row_text(&self, y: u16) -> String {
        if y >= self.height {
            return String::new();
        }
        let start = y as usize * self.width as usize;
        self.cells[start..start + self.width as usize]
            .iter()
            .map(|c| c.glyph)
            .collect()
    }

    pub fn count_non_blank(&self) -> usize {
        self.cells.iter().filter(|c| c.glyph != ' ').count()
    }
}

/// Cells on the Bresenham line between two points.
pub fn line_points(from: (i32, i32), to: (i32, i32)) -> Vec<(i32, i32)> {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    let mut out = Vec::with_capacity((dx - dy + 1) as usize);
    loop {
        out.push((x, y));
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    out
}

// ═════════════════════════════════════════════════════════════════════════════
// GLYPH PALETTES
// ═════════════════════════════════════════════════════════════════════════════

/// Character set modes draw with. Swapped wholesale by the ASCII toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyphs {
    /// Solid bar body
    pub block: char,
    /// Partial bar tops [1/8 .. 7/8]; empty in ASCII mode
    pub eighths: &'static [char],
    /// Floating peak marker
    pub peak: char,
    /// Waveform segment crossing rows
    pub wave_vertical: char,
    /// Waveform segment staying on one row
    pub wave_flat: char,
    /// Center axis
    pub axis: char,
    /// Circle outline
    pub orbit: char,
    /// Particle glyphs, brightest first
    pub spark: &'static [char],
    /// Fading trail glyphs, brightest first
    pub trail: &'static [char],
    /// Empty meter segment
    pub meter_empty: char,
    pub halo: char,
    pub ray: char,
}

impl Glyphs {
    pub const UNICODE: Self = Self {
        block: '█',
        eighths: &['▁', '▂', '▃', '▄', '▅', '▆', '▇'],
        peak: '▬',
        wave_vertical: '│',
        wave_flat: '─',
        axis: '─',
        orbit: '•',
        spark: &['✦', '✧', '•', '·'],
        trail: &['✶', '✳', '•', '·'],
        meter_empty: '░',
        halo: '·',
        ray: '∙',
    };

    pub const ASCII: Self = Self {
        block: '#',
        eighths: &[],
        peak: '=',
        wave_vertical: '|',
        wave_flat: '-',
        axis: '-',
        orbit: 'o',
        spark: &['*', '+', '.', '.'],
        trail: &['*', '+', '.', '.'],
        meter_empty: '.',
        halo: '.',
        ray: '+',
    };

    pub fn for_ascii(ascii: bool) -> Self {
        if ascii {
            Self::ASCII
        } else {
            Self::UNICODE
        }
    }

    /// Glyph for a bar top filled to `frac` of a cell, or `None` when the
    /// remainder is too small to show.
    pub fn partial(&self, frac: f32) -> Option<char> {
        if self.eighths.is_empty() {
            return (frac >= 0.5).then_some(self.block);
        }
        let eighth = (frac.clamp(0.0, 1.0) * 8.0) as usize;
        match eighth {
            0 => None,
            8 => Some(self.block),
            n => self.eighths.get(n - 1).copied(),
        }
    }

    /// Pick from a brightest-first set by intensity in [0, 1].
    pub fn by_intensity(set: &[char], intensity: f32) -> char {
        if set.is_empty() {
            return ' ';
        }
        let t = 1.0 - intensity.clamp(0.0, 1.0);
        let idx = ((t * set.len() as f32) as usize).min(set.len() - 1);
        set[idx]
    }

    pub fn is_ascii(&self) -> bool {
        *self == Self::ASCII
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut g = FrameGrid::new(4, 3);
        g.set(-1, 0, 'x', ColorTier::Red);
        g.set(4, 0, 'x', ColorTier::Red);
        g.set(0, 3, 'x', ColorTier::Red);
        assert_eq!(g.count_non_blank(), 0);
        g.set(3, 2, 'x', ColorTier::Red);
        assert_eq!(g.get(3, 2), Some(RenderCell::new('x', ColorTier::Red)));
    }

    #[test]
    fn line_is_eight_connected() {
        for to in [(9, 3), (-7, 5), (0, -6), (4, 4), (-3, -8)] {
            let pts = line_points((0, 0), to);
            assert_eq!(pts[0], (0, 0));
            assert_eq!(*pts.last().unwrap(), to);
            for w in pts.windows(2) {
                assert!((w[1].0 - w[0].0).abs() <= 1 && (w[1].1 - w[0].1).abs() <= 1);
            }
        }
    }

    #[test]
    fn cells_iterate_row_major() {
        let mut g = FrameGrid::new(3, 2);
        g.put_str(0, 1, "abc", ColorTier::Green);
        let marked: Vec<_> = g
            .cells()
            .filter(|(_, _, c)| c.glyph != ' ')
            .map(|(r, c, cell)| (r, c, cell.glyph))
            .collect();
        assert_eq!(marked, vec![(1, 0, 'a'), (1, 1, 'b'), (1, 2, 'c')]);
        assert_eq!(g.row_text(1), "abc");
    }

    #[test]
    fn partial_tops() {
        let u = Glyphs::UNICODE;
        assert_eq!(u.partial(0.05), None);
        assert_eq!(u.partial(0.5), Some('▄'));
        assert_eq!(u.partial(1.0), Some('█'));
        let a = Glyphs::ASCII;
        assert_eq!(a.partial(0.3), None);
        assert_eq!(a.partial(0.7), Some('#'));
    }

    #[test]
    fn ascii_palette_is_ascii() {
        let a = Glyphs::ASCII;
        let all = [a.block, a.peak, a.wave_vertical, a.wave_flat, a.axis, a.orbit, a.meter_empty, a.halo, a.ray];
        assert!(all.iter().chain(a.spark).chain(a.trail).all(char::is_ascii));
        assert!(a.is_ascii());
    }
}
