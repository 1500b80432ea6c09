//! App: the render loop.
//!
//! - A blocking task polls crossterm for input and forwards events over an
//!   `mpsc` channel.
//! - A `tokio::time::interval` at the configured fps drives frames. Late
//!   ticks are delayed, never bunched up.
//! - Each frame: re-read the display size, snapshot the sample buffer, run
//!   the engine, stamp toasts, present the diff. Resize events only hint;
//!   the size read at tick start is what the frame is laid out for.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use ratatui::crossterm::event::{self, Event};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use wavetty_core::{Config, ControlSnapshot, DiffRenderer, Engine, FrameStats, SampleBuffer, Surface};

use crate::action::Action;
use crate::terminal::TerminalSurface;
use crate::toast::{Severity, ToastManager};

const INPUT_POLL: Duration = Duration::from_millis(50);
/// Give up after this many consecutive failed flushes; the terminal is gone.
const MAX_FLUSH_FAILURES: u32 = 120;
const STATS_EVERY_FRAMES: u64 = 600;

pub struct App {
    config: Config,
    config_path: PathBuf,
    controls: ControlSnapshot,
    engine: Engine,
    renderer: DiffRenderer,
    toasts: ToastManager,
    buffer: SampleBuffer,
    stale_after: Duration,
    last_stats: FrameStats,
    last_size: Option<(u16, u16)>,
    flush_failures: u32,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, config_path: PathBuf, buffer: SampleBuffer) -> Self {
        let engine = Engine::from_config(&config, buffer.sample_rate());
        Self {
            controls: config.controls(),
            toasts: ToastManager::new(config.display.toasts),
            stale_after: Duration::from_millis(config.audio.stale_after_ms),
            engine,
            renderer: DiffRenderer::new(),
            buffer,
            config,
            config_path,
            last_stats: FrameStats::default(),
            last_size: None,
            flush_failures: 0,
            should_quit: false,
        }
    }

    pub fn announce(&mut self, message: impl Into<String>, severity: Severity) {
        match severity {
            Severity::Info => self.toasts.info(message),
            Severity::Success => self.toasts.success(message),
            Severity::Warning => self.toasts.warning(message),
            Severity::Error => self.toasts.error(message),
        }
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::NextMode => {
                self.controls.mode = self.controls.mode.next();
                self.toasts.info(format!("mode: {}", self.controls.mode.label()));
            }
            Action::NextScheme => {
                self.controls.scheme = self.controls.scheme.next();
                self.toasts.info(format!("colors: {}", self.controls.scheme));
            }
            Action::CycleEq => {
                self.controls.eq = self.controls.eq.next();
                self.toasts.info(format!("eq: {}", self.controls.eq));
            }
            Action::ToggleAscii => {
                self.controls.ascii = !self.controls.ascii;
                let state = if self.controls.ascii { "on" } else { "off" };
                self.toasts.info(format!("ascii: {}", state));
            }
            Action::SaveConfig => self.save_config(),
            Action::Resize(cols, rows) => {
                debug!("resize to {}x{}", cols, rows);
                self.renderer.invalidate();
            }
            Action::Quit => self.should_quit = true,
        }
    }

    fn save_config(&mut self) {
        self.config.apply_controls(&self.controls);
        match self.config.save_to(&self.config_path) {
            Ok(()) => {
                info!("saved config to {}", self.config_path.display());
                self.toasts.success("settings saved");
            }
            Err(e) => {
                warn!("could not save config: {}", e);
                self.toasts.error("save failed (see log)");
            }
        }
    }

    /// Produce and present one frame. Only a surface that keeps refusing to
    /// flush is reported back.
    pub fn render_frame<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        elapsed: Duration,
    ) -> anyhow::Result<()> {
        let (cols, rows) = match surface.refresh_size() {
            Ok(size) => size,
            Err(e) => {
                warn!("could not read surface size: {}", e);
                return Ok(());
            }
        };
        if self.last_size != Some((cols, rows)) {
            if self.last_size.is_some() {
                debug!("display now {}x{}", cols, rows);
            }
            self.last_size = Some((cols, rows));
            self.renderer.invalidate();
        }

        let window = self
            .buffer
            .snapshot(self.engine.required_samples(), self.stale_after);
        self.toasts.tick(Instant::now());
        let grid = self.engine.tick(&window, self.controls, cols, rows, elapsed);
        self.toasts.stamp(grid);

        match self.renderer.present(grid, surface) {
            Ok(stats) => {
                self.last_stats = stats;
                self.flush_failures = 0;
                if self.renderer.frames() % STATS_EVERY_FRAMES == 0 {
                    debug!(
                        "frame {}: {} writes, {} skipped, {} particles",
                        self.renderer.frames(),
                        stats.writes,
                        stats.skipped,
                        self.engine.particle_count()
                    );
                }
            }
            Err(e) => {
                self.flush_failures += 1;
                if self.flush_failures == 1 {
                    warn!("frame dropped: {}", e);
                }
                if self.flush_failures >= MAX_FLUSH_FAILURES {
                    anyhow::bail!("terminal stopped accepting output: {}", e);
                }
            }
        }
        Ok(())
    }

    pub async fn run(mut self, surface: &mut TerminalSurface) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<Event>(256);

        // ── Background task: keyboard/resize events ──────────────────────────
        // Polls with a timeout so it notices the receiver closing on quit.
        tokio::task::spawn_blocking(move || loop {
            if tx.is_closed() {
                break;
            }
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("input read failed: {}", e);
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!("input poll failed: {}", e);
                    break;
                }
            }
        });

        let fps = self.config.display.fps.max(1);
        let mut frame_tick = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
        frame_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let started = Instant::now();
        info!("render loop at {} fps", fps);

        loop {
            tokio::select! {
                _ = frame_tick.tick() => {
                    self.render_frame(surface, started.elapsed())?;
                }
                msg = rx.recv() => match msg {
                    Some(event) => {
                        if let Some(action) = Action::from_event(&event) {
                            if let Action::Resize(cols, rows) = action {
                                surface.set_size(cols, rows);
                            }
                            self.handle_action(action);
                        }
                    }
                    None => {
                        warn!("input closed; quitting");
                        self.should_quit = true;
                    }
                },
            }

            if self.should_quit {
                break;
            }
        }

        info!("render loop stopped after {} frames", self.renderer.frames());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavetty_core::{ColorScheme, ColorTier, EqStrength, ModeKind, SurfaceError};

    struct Recording {
        /// What the device reports when asked.
        device_size: (u16, u16),
        /// What `size` returns until refreshed.
        cached_size: (u16, u16),
        writes: usize,
        out_of_bounds: usize,
        fail_flush: bool,
    }

    impl Default for Recording {
        fn default() -> Self {
            Self {
                device_size: (60, 20),
                cached_size: (60, 20),
                writes: 0,
                out_of_bounds: 0,
                fail_flush: false,
            }
        }
    }

    impl Surface for Recording {
        fn size(&self) -> Result<(u16, u16), SurfaceError> {
            Ok(self.cached_size)
        }

        fn refresh_size(&mut self) -> Result<(u16, u16), SurfaceError> {
            self.cached_size = self.device_size;
            Ok(self.cached_size)
        }

        fn clear(&mut self) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn set_cell(&mut self, row: u16, col: u16, _glyph: char, _tier: ColorTier) -> Result<(), SurfaceError> {
            let (cols, rows) = self.device_size;
            if row >= rows || col >= cols {
                self.out_of_bounds += 1;
            }
            self.writes += 1;
            Ok(())
        }

        fn flush(&mut self) -> Result<(), SurfaceError> {
            if self.fail_flush {
                return Err(SurfaceError::Io(std::io::Error::other("gone")));
            }
            Ok(())
        }
    }

    fn app(dir: &tempfile::TempDir) -> App {
        let mut config = Config::default();
        config.display.toasts = false;
        let buffer = SampleBuffer::new(8192, 44100);
        App::new(config, dir.path().join("config.toml"), buffer)
    }

    #[test]
    fn actions_cycle_controls() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let start = app.controls;

        app.handle_action(Action::NextMode);
        app.handle_action(Action::NextScheme);
        app.handle_action(Action::CycleEq);
        app.handle_action(Action::ToggleAscii);

        let now = app.controls;
        assert_eq!(now.mode, start.mode.next());
        assert_eq!(now.scheme, start.scheme.next());
        assert_eq!(now.eq, start.eq.next());
        assert_eq!(now.ascii, !start.ascii);
        assert!(!app.should_quit);

        app.handle_action(Action::Quit);
        assert!(app.should_quit);
    }

    #[test]
    fn save_persists_live_controls() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        app.controls = ControlSnapshot {
            mode: ModeKind::Levels,
            scheme: ColorScheme::Heat,
            eq: EqStrength::Strong,
            ascii: true,
        };
        app.handle_action(Action::SaveConfig);

        let saved = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(saved.display.mode, ModeKind::Levels);
        assert_eq!(saved.display.color_scheme, ColorScheme::Heat);
        assert_eq!(saved.display.eq, EqStrength::Strong);
        assert!(saved.display.ascii);
    }

    #[test]
    fn live_audio_reaches_the_surface() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let tone: Vec<f32> = (0..4096)
            .map(|i| 0.6 * (2.0 * std::f32::consts::PI * 500.0 * i as f32 / 44100.0).sin())
            .collect();
        app.buffer.push(&tone);

        let mut surface = Recording::default();
        app.render_frame(&mut surface, Duration::ZERO).unwrap();
        assert!(surface.writes > 0);
    }

    #[test]
    fn resize_forces_full_redraw() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let mut surface = Recording::default();
        app.render_frame(&mut surface, Duration::ZERO).unwrap();
        assert!(app.last_stats.full_redraw);
        app.render_frame(&mut surface, Duration::from_millis(16)).unwrap();
        assert!(!app.last_stats.full_redraw);

        app.handle_action(Action::Resize(60, 20));
        app.render_frame(&mut surface, Duration::from_millis(32)).unwrap();
        assert!(app.last_stats.full_redraw);
    }

    #[test]
    fn shrink_without_resize_event_is_seen_at_tick_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let tone: Vec<f32> = (0..4096)
            .map(|i| 0.8 * (2.0 * std::f32::consts::PI * 300.0 * i as f32 / 44100.0).sin())
            .collect();
        app.buffer.push(&tone);

        let mut surface = Recording::default();
        app.render_frame(&mut surface, Duration::ZERO).unwrap();
        app.render_frame(&mut surface, Duration::from_millis(16)).unwrap();
        assert!(!app.last_stats.full_redraw);

        // the Resize event is still queued behind this tick
        surface.device_size = (40, 10);
        app.buffer.push(&tone);
        app.render_frame(&mut surface, Duration::from_millis(32)).unwrap();
        assert!(app.last_stats.full_redraw);
        assert_eq!(surface.out_of_bounds, 0);
        assert_eq!(app.engine.grid().size(), (40, 10));
    }

    #[test]
    fn persistent_flush_failure_ends_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(&dir);
        let mut surface = Recording {
            fail_flush: true,
            ..Recording::default()
        };
        for i in 1..MAX_FLUSH_FAILURES {
            assert!(app.render_frame(&mut surface, Duration::from_millis(i as u64)).is_ok());
        }
        assert!(app.render_frame(&mut surface, Duration::from_secs(5)).is_err());
    }
}
