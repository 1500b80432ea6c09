//! End-to-end checks through the public API: buffer, analyzer, smoother,
//! modes and the differential renderer together.

use std::collections::{HashSet, VecDeque};
use std::f32::consts::PI;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use wavetty_core::{
    AnalyzerConfig, ColorScheme, ColorTier, ControlSnapshot, DiffRenderer, Engine, EqStrength,
    FrameGrid, ModeKind, ModeOptions, SampleBuffer, SampleWindow, SmoothingConfig,
    SpectralAnalyzer, Surface, SurfaceError,
};

const RATE: u32 = 44100;

fn sine(freq: f32, amp: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| amp * (2.0 * PI * freq * i as f32 / RATE as f32).sin())
        .collect()
}

fn engine(mode: ModeKind, overlays: bool) -> Engine {
    Engine::new(
        &AnalyzerConfig::default(),
        &SmoothingConfig::default(),
        ModeOptions {
            circle_overlays: overlays,
            seed: Some(2024),
            ..ModeOptions::default()
        },
        mode,
        RATE,
    )
}

fn controls(mode: ModeKind) -> ControlSnapshot {
    ControlSnapshot {
        mode,
        scheme: ColorScheme::Multicolor,
        eq: EqStrength::Off,
        ascii: false,
    }
}

#[test]
fn sine_440_peaks_in_its_band() {
    let config = AnalyzerConfig {
        bands: 64,
        ..AnalyzerConfig::default()
    };
    let mut analyzer = SpectralAnalyzer::new(&config, RATE);
    let window = SampleWindow::from_samples(sine(440.0, 0.8, 1024), RATE);
    let out = analyzer.analyze(&window, EqStrength::Off, 80);

    let target = analyzer.layout().band_for(440.0).unwrap();
    let peak = out.bands.argmax().unwrap();
    assert!(
        peak.abs_diff(target) <= 1,
        "peak band {peak}, 440 Hz lives in band {target}"
    );
    assert!(out.bands.values[peak] > 0.9);
    for (i, &v) in out.bands.values.iter().enumerate() {
        if i.abs_diff(target) >= 5 {
            assert!(v < 0.05, "band {i} = {v} should be near the floor");
        }
    }
}

#[test]
fn silence_is_zero_for_every_eq_mode() {
    for eq in EqStrength::ALL {
        let mut analyzer = SpectralAnalyzer::new(&AnalyzerConfig::default(), RATE);
        let window = SampleWindow::from_samples(vec![0.0; 4096], RATE);
        for _ in 0..5 {
            let out = analyzer.analyze(&window, eq, 10);
            assert!(out.bands.values.iter().all(|&v| v == 0.0));
        }
    }
}

#[test]
fn full_scale_transient_spawns_particles_in_radial_burst() {
    let mut e = engine(ModeKind::RadialBurst, true);
    let quiet = SampleWindow::from_samples(vec![0.0; 2048], RATE);
    for i in 0..20 {
        e.tick(&quiet, controls(ModeKind::RadialBurst), 80, 24, Duration::from_millis(16 * i));
    }
    assert_eq!(e.particle_count(), 0);

    let mut rng = StdRng::seed_from_u64(9);
    let burst: Vec<f32> = (0..2048)
        .map(|_| if rng.gen::<bool>() { 1.0 } else { -1.0 })
        .collect();
    let burst = SampleWindow::from_samples(burst, RATE);
    e.tick(&burst, controls(ModeKind::RadialBurst), 80, 24, Duration::from_millis(336));
    assert!(e.particle_count() >= 1);
}

#[derive(Default)]
struct RecordingSurface {
    writes: usize,
    flushes: usize,
}

impl Surface for RecordingSurface {
    fn size(&self) -> Result<(u16, u16), SurfaceError> {
        Ok((80, 24))
    }

    fn clear(&mut self) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn set_cell(&mut self, _row: u16, _col: u16, _glyph: char, _tier: ColorTier) -> Result<(), SurfaceError> {
        self.writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SurfaceError> {
        self.flushes += 1;
        Ok(())
    }
}

#[test]
fn identical_frames_cost_no_writes() {
    let mut e = engine(ModeKind::Spectrum, true);
    let window = SampleWindow::from_samples(sine(1200.0, 0.6, 2048), RATE);
    let frame = e
        .tick(&window, controls(ModeKind::Spectrum), 80, 24, Duration::ZERO)
        .clone();

    let mut surface = RecordingSurface::default();
    let mut renderer = DiffRenderer::new();
    let first = renderer.present(&frame, &mut surface).unwrap();
    assert!(first.writes > 0);

    let before = surface.writes;
    let second = renderer.present(&frame, &mut surface).unwrap();
    assert_eq!(second.writes, 0);
    assert_eq!(surface.writes, before);
    assert_eq!(surface.flushes, 2);
}

#[test]
fn peaks_decay_after_a_transient() {
    let mut e = engine(ModeKind::Spectrum, true);
    let loud = SampleWindow::from_samples(sine(2000.0, 1.0, 2048), RATE);
    let silent = SampleWindow::silent(RATE);
    e.tick(&loud, controls(ModeKind::Spectrum), 80, 24, Duration::ZERO);
    let mut last = e.smoother().peaks().to_vec();
    assert!(last.iter().any(|&p| p > 0.5));
    for i in 1..80 {
        e.tick(&silent, controls(ModeKind::Spectrum), 80, 24, Duration::from_millis(16 * i));
        let now = e.smoother().peaks();
        for (band, (n, l)) in now.iter().zip(&last).enumerate() {
            assert!(n <= l, "peak {band} rose from {l} to {n}");
        }
        last = now.to_vec();
    }
}

fn outline_cells(grid: &FrameGrid) -> HashSet<(i32, i32)> {
    grid.cells()
        .filter(|(_, _, c)| c.glyph == '•')
        .map(|(r, c, _)| (c as i32, r as i32))
        .collect()
}

fn is_connected(cells: &HashSet<(i32, i32)>) -> bool {
    let Some(&start) = cells.iter().next() else {
        return false;
    };
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some((x, y)) = queue.pop_front() {
        for dx in -1..=1 {
            for dy in -1..=1 {
                let next = (x + dx, y + dy);
                if cells.contains(&next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    seen.len() == cells.len()
}

#[test]
fn circular_wave_outline_has_no_gaps() {
    let mut rng = StdRng::seed_from_u64(77);
    let noisy: Vec<f32> = (0..2048).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let windows = [
        SampleWindow::from_samples(sine(180.0, 0.9, 2048), RATE),
        SampleWindow::from_samples(noisy, RATE),
        SampleWindow::silent(RATE),
    ];
    for window in &windows {
        for w in (12..=220).step_by(13) {
            for h in (6..=70).step_by(7) {
                let mut e = engine(ModeKind::CircularWave, false);
                let grid = e.tick(window, controls(ModeKind::CircularWave), w, h, Duration::ZERO);
                let cells = outline_cells(grid);
                assert!(is_connected(&cells), "gap in circle at {w}x{h}");
            }
        }
    }
}

#[test]
fn stalled_source_decays_to_flat() {
    let buffer = SampleBuffer::new(4096, RATE);
    buffer.push(&sine(600.0, 0.8, 4096));
    let mut e = engine(ModeKind::Bars, true);
    let stale_after = Duration::from_millis(250);

    let fresh = buffer.snapshot(e.required_samples(), stale_after);
    e.tick(&fresh, controls(ModeKind::Bars), 64, 16, Duration::ZERO);
    assert!(e.grid().count_non_blank() > 0);

    // the producer goes away; the buffer now reports silence
    let later = std::time::Instant::now() + Duration::from_secs(1);
    for i in 1..60 {
        let window = buffer.snapshot_at(e.required_samples(), stale_after, later);
        assert!(window.is_empty());
        e.tick(&window, controls(ModeKind::Bars), 64, 16, Duration::from_millis(16 * i));
    }
    assert_eq!(e.grid().count_non_blank(), 0);
}
