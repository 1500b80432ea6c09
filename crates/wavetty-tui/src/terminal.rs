//! Terminal ownership and the crossterm-backed display surface.

use std::io::{self, BufWriter, Stdout};

use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::buffer::Cell;
use ratatui::crossterm::{
    cursor, execute, queue,
    terminal::{
        self, disable_raw_mode, enable_raw_mode, BeginSynchronizedUpdate, ClearType,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use ratatui::style::Color;
use tracing::{debug, warn};

use wavetty_core::{ColorTier, Surface, SurfaceError};

/// Raw mode, alternate screen and hidden cursor for as long as it lives.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut guard = Self { active: true };
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, cursor::Hide) {
            guard.restore();
            return Err(e);
        }
        debug!("terminal: raw mode + alternate screen");
        Ok(guard)
    }

    pub fn restore(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        restore_terminal();
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Best effort; every step runs even if an earlier one fails.
pub fn restore_terminal() {
    let _ = execute!(io::stdout(), EndSynchronizedUpdate, cursor::Show, LeaveAlternateScreen);
    let _ = disable_raw_mode();
}

/// Restore the terminal before the default hook prints, so the panic message
/// lands on a usable screen.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        default_hook(info);
    }));
}

pub fn tier_color(tier: ColorTier) -> Color {
    match tier {
        ColorTier::Dim => Color::DarkGray,
        ColorTier::Blue => Color::Blue,
        ColorTier::Cyan => Color::Cyan,
        ColorTier::Green => Color::Green,
        ColorTier::Yellow => Color::Yellow,
        ColorTier::Red => Color::Red,
        ColorTier::Magenta => Color::Magenta,
        ColorTier::White => Color::White,
    }
}

/// Queues cell writes and emits them in one synchronized update on flush.
pub struct TerminalSurface {
    backend: CrosstermBackend<BufWriter<Stdout>>,
    pending: Vec<(u16, u16, Cell)>,
    clear_pending: bool,
    size: (u16, u16),
}

impl TerminalSurface {
    pub fn new() -> io::Result<Self> {
        let backend = CrosstermBackend::new(BufWriter::new(io::stdout()));
        let size = terminal::size()?;
        Ok(Self {
            backend,
            pending: Vec::new(),
            clear_pending: true,
            size,
        })
    }

    /// Resize hint from an input event; the next tick re-reads the real
    /// size anyway.
    pub fn set_size(&mut self, cols: u16, rows: u16) {
        self.size = (cols, rows);
    }
}

impl Surface for TerminalSurface {
    fn size(&self) -> Result<(u16, u16), SurfaceError> {
        Ok(self.size)
    }

    fn refresh_size(&mut self) -> Result<(u16, u16), SurfaceError> {
        let size = terminal::size()?;
        if size != self.size {
            debug!("terminal size {:?} -> {:?}", self.size, size);
            self.size = size;
        }
        Ok(size)
    }

    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.pending.clear();
        self.clear_pending = true;
        Ok(())
    }

    fn set_cell(&mut self, row: u16, col: u16, glyph: char, tier: ColorTier) -> Result<(), SurfaceError> {
        let (cols, rows) = self.size;
        if row >= rows || col >= cols {
            return Err(SurfaceError::OutOfBounds { row, col, rows, cols });
        }
        let mut cell = Cell::default();
        cell.set_char(glyph).set_fg(tier_color(tier));
        self.pending.push((col, row, cell));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SurfaceError> {
        let result = self.write_pending();
        if result.is_err() {
            warn!("terminal flush failed; dropping {} queued cells", self.pending.len());
        }
        self.pending.clear();
        result
    }
}

impl TerminalSurface {
    fn write_pending(&mut self) -> Result<(), SurfaceError> {
        queue!(self.backend, BeginSynchronizedUpdate)?;
        if self.clear_pending {
            queue!(self.backend, terminal::Clear(ClearType::All))?;
            self.clear_pending = false;
        }
        self.backend
            .draw(self.pending.iter().map(|(x, y, cell)| (*x, *y, cell)))?;
        queue!(self.backend, EndSynchronizedUpdate)?;
        Backend::flush(&mut self.backend)?;
        Ok(())
    }
}
