//! Per-tick pipeline: analyze, smooth, render.
//!
//! [`Engine`] is the single owner of the analyzer, the smoothing state and
//! the active mode. The render loop hands it one sample window and one
//! control snapshot per tick and gets back the frame to present.

use std::time::Duration;

use tracing::{debug, info};

use crate::analyzer::{AnalyzerConfig, EqStrength, SpectralAnalyzer};
use crate::color::ColorScheme;
use crate::config::Config;
use crate::grid::{FrameGrid, Glyphs};
use crate::modes::{self, FrameInput, ModeKind, ModeOptions, VisualMode};
use crate::sample_buffer::SampleWindow;
use crate::smoothing::{SmoothingConfig, SpectrumSmoother};

/// User-controlled settings, read once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlSnapshot {
    pub mode: ModeKind,
    pub scheme: ColorScheme,
    pub eq: EqStrength,
    pub ascii: bool,
}

pub struct Engine {
    analyzer: SpectralAnalyzer,
    smoother: SpectrumSmoother,
    smoothing: SmoothingConfig,
    options: ModeOptions,
    mode: Box<dyn VisualMode>,
    grid: FrameGrid,
    last_elapsed: Option<Duration>,
    ticks: u64,
}

impl Engine {
    pub fn new(
        analyzer: &AnalyzerConfig,
        smoothing: &SmoothingConfig,
        options: ModeOptions,
        initial_mode: ModeKind,
        sample_rate: u32,
    ) -> Self {
        let analyzer = SpectralAnalyzer::new(analyzer, sample_rate);
        let (smoothing, _) = smoothing.sanitized();
        let smoother = SpectrumSmoother::new(analyzer.bands(), &smoothing);
        let mode = modes::build(initial_mode, &options);
        Self {
            analyzer,
            smoother,
            smoothing,
            options,
            mode,
            grid: FrameGrid::default(),
            last_elapsed: None,
            ticks: 0,
        }
    }

    pub fn from_config(config: &Config, sample_rate: u32) -> Self {
        Self::new(
            &config.analyzer,
            &config.smoothing,
            config.mode_options(),
            config.display.mode,
            sample_rate,
        )
    }

    /// Samples to snapshot from the buffer each tick.
    pub fn required_samples(&self) -> usize {
        self.analyzer.window_len()
    }

    pub fn mode(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    pub fn smoother(&self) -> &SpectrumSmoother {
        &self.smoother
    }

    pub fn grid(&self) -> &FrameGrid {
        &self.grid
    }

    pub fn particle_count(&self) -> usize {
        self.mode.particle_count()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick and return the frame to present. `elapsed` is time since
    /// the render loop started.
    pub fn tick(
        &mut self,
        window: &SampleWindow,
        controls: ControlSnapshot,
        width: u16,
        height: u16,
        elapsed: Duration,
    ) -> &mut FrameGrid {
        if controls.mode != self.mode.kind() {
            info!("mode {} -> {}", self.mode.kind(), controls.mode);
            self.mode = modes::build(controls.mode, &self.options);
            self.mode.resize(width, height);
        }

        if self.grid.size() != (width, height) {
            debug!("frame grid {:?} -> {:?}", self.grid.size(), (width, height));
            self.grid.resize(width, height);
            self.mode.resize(width, height);
        } else {
            self.grid.clear();
        }

        let analysis = self.analyzer.analyze(window, controls.eq, width as usize);

        let alpha = if controls.mode.is_waveform_domain() {
            self.smoothing.waveform_alpha
        } else {
            self.smoothing.spectrum_alpha
        };
        self.smoother.update(&analysis.bands.values, alpha);
        self.smoother
            .update_waveform(&analysis.waveform.points, self.smoothing.waveform_alpha);

        let dt = self
            .last_elapsed
            .map(|last| elapsed.saturating_sub(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_elapsed = Some(elapsed);

        let input = FrameInput {
            spectrum: self.smoother.smoothed(),
            peaks: self.smoother.peaks(),
            waveform: self.smoother.waveform(),
            band_centers: self.analyzer.layout().centers(),
            elapsed: elapsed.as_secs_f32(),
            dt,
            scheme: controls.scheme,
            glyphs: Glyphs::for_ascii(controls.ascii),
        };
        self.mode.render(&input, &mut self.grid);
        self.ticks += 1;

        &mut self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new(
            &AnalyzerConfig::default(),
            &SmoothingConfig::default(),
            ModeOptions {
                seed: Some(1),
                ..ModeOptions::default()
            },
            ModeKind::Bars,
            44100,
        )
    }

    fn tone(len: usize) -> SampleWindow {
        let samples = (0..len)
            .map(|i| 0.7 * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 44100.0).sin())
            .collect();
        SampleWindow::from_samples(samples, 44100)
    }

    #[test]
    fn silent_window_renders_empty_bars() {
        let mut e = engine();
        let grid = e.tick(
            &SampleWindow::silent(44100),
            ControlSnapshot::default(),
            40,
            10,
            Duration::ZERO,
        );
        assert_eq!(grid.size(), (40, 10));
        assert_eq!(grid.count_non_blank(), 0);
    }

    #[test]
    fn mode_switch_renders_immediately_and_keeps_smoothing() {
        let mut e = engine();
        let window = tone(2048);
        let mut controls = ControlSnapshot::default();
        for i in 0..5 {
            e.tick(&window, controls, 60, 16, Duration::from_millis(16 * i));
        }
        let before = e.smoother().smoothed().to_vec();

        controls.mode = ModeKind::Spectrum;
        let grid = e.tick(&window, controls, 60, 16, Duration::from_millis(100));
        assert!(grid.count_non_blank() > 0);
        assert_eq!(e.mode(), ModeKind::Spectrum);
        // smoothing carried over: the first spectrum frame is not a cold start
        let after = e.smoother().smoothed();
        let peak = before.iter().copied().fold(0.0, f32::max);
        assert!(after.iter().copied().fold(0.0, f32::max) >= peak * 0.9);
    }

    #[test]
    fn resize_changes_grid() {
        let mut e = engine();
        let window = tone(2048);
        e.tick(&window, ControlSnapshot::default(), 30, 8, Duration::ZERO);
        let grid = e.tick(&window, ControlSnapshot::default(), 50, 12, Duration::from_millis(16));
        assert_eq!(grid.size(), (50, 12));
    }

    #[test]
    fn every_mode_renders_a_tone() {
        let window = tone(2048);
        for mode in ModeKind::ALL {
            let mut e = engine();
            let controls = ControlSnapshot {
                mode,
                ..ControlSnapshot::default()
            };
            for i in 0..3 {
                e.tick(&window, controls, 80, 24, Duration::from_millis(16 * i));
            }
            assert!(e.grid().count_non_blank() > 0, "{mode} drew nothing");
        }
    }

    #[test]
    fn ascii_toggle_restricts_glyphs() {
        let window = tone(2048);
        for mode in ModeKind::ALL {
            let mut e = engine();
            let controls = ControlSnapshot {
                mode,
                ascii: true,
                ..ControlSnapshot::default()
            };
            for i in 0..3 {
                e.tick(&window, controls, 80, 24, Duration::from_millis(16 * i));
            }
            assert!(
                e.grid().cells().all(|(_, _, c)| c.glyph.is_ascii()),
                "{mode} used a non-ascii glyph"
            );
        }
    }
}
