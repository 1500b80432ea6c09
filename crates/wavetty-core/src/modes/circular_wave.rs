//! A circle whose radius breathes with the waveform.
//!
//! The outline is sampled at a fixed number of points (at least
//! [`MIN_CIRCLE_POINTS`]) and consecutive points are joined with line
//! segments, closing back to the first, so the curve is one connected set of
//! cells at every grid size. Optional overlays sit underneath it: sparks
//! orbiting the ring, a rotating halo and radial rays on loud passages.

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::Rng;

use super::particles::{Particle, ParticlePool};
use super::{FrameInput, ModeKind, ModeOptions, VisualMode, MIN_CIRCLE_POINTS};
use crate::analyzer::resample;
use crate::color::ColorTier;
use crate::grid::{FrameGrid, Glyphs};

/// Terminal cells are roughly twice as tall as wide.
const ASPECT: f32 = 0.5;
/// Fraction of the base radius the waveform can push the outline.
const MODULATION: f32 = 0.4;
const MIN_NORMALIZE: f32 = 0.05;

const HALO_DOTS: usize = 24;
const RAYS: usize = 8;
/// Orbit sparks are retired once they drift this far out (radius multiple).
const SPARK_MAX_RADIUS: f32 = 2.5;

pub struct CircularWave {
    points: usize,
    overlays: bool,
    /// Polar sparks: `x` is the angle, `y` the radius multiple, `vx`/`vy`
    /// their per-tick rates.
    sparks: ParticlePool,
    rng: StdRng,
}

impl CircularWave {
    pub fn new(options: &ModeOptions) -> Self {
        Self {
            points: options.circle_points.max(MIN_CIRCLE_POINTS),
            overlays: options.circle_overlays,
            sparks: ParticlePool::new(options.particle_capacity.min(256)),
            rng: options.rng(),
        }
    }

    pub fn points(&self) -> usize {
        self.points
    }

    pub fn spark_count(&self) -> usize {
        self.sparks.len()
    }

    fn spawn_sparks(&mut self, energy: f32) {
        if energy < 0.05 {
            return;
        }
        let wanted = energy * 6.0;
        let mut count = wanted.floor() as usize;
        if self.rng.gen::<f32>() < wanted.fract() {
            count += 1;
        }
        for _ in 0..count {
            let angle = self.rng.gen_range(0.0..TAU);
            let spin = self.rng.gen_range(0.02..0.08) * (0.5 + energy);
            let drift = self.rng.gen_range(0.004..0.02);
            let ttl = self.rng.gen_range(20..50);
            if !self.sparks.spawn(Particle::new(angle, 1.05, spin, drift, ttl)) {
                break;
            }
        }
    }

    fn draw_overlays(
        &self,
        input: &FrameInput<'_>,
        grid: &mut FrameGrid,
        center: (f32, f32),
        base: f32,
        energy: f32,
    ) {
        let (cx, cy) = center;
        let plot = |grid: &mut FrameGrid, angle: f32, r: f32, glyph: char, tier: ColorTier| {
            let x = (cx + r * angle.cos()).round() as i32;
            let y = (cy + r * angle.sin() * ASPECT).round() as i32;
            grid.set(x, y, glyph, tier);
        };

        if energy > 0.1 {
            let spin = input.elapsed * 0.3;
            let tier = input.scheme.tier(energy, 0.5);
            for i in 0..HALO_DOTS {
                let angle = i as f32 * TAU / HALO_DOTS as f32 + spin;
                plot(grid, angle, base * (1.0 + MODULATION) + 2.0, input.glyphs.halo, tier);
            }
        }

        if energy > 0.35 {
            let spin = -input.elapsed * 0.5;
            let inner = base * (1.0 + MODULATION) + 1.0;
            let len = energy * base * 0.6;
            for i in 0..RAYS {
                let angle = i as f32 * TAU / RAYS as f32 + spin;
                let tier = input.scheme.tier(energy, i as f32 / RAYS as f32);
                let steps = len.ceil().max(1.0) as usize;
                for s in 0..=steps {
                    plot(grid, angle, inner + len * s as f32 / steps as f32, input.glyphs.ray, tier);
                }
            }
        }

        for p in self.sparks.iter() {
            let glyph = Glyphs::by_intensity(input.glyphs.spark, p.life());
            let tier = input.scheme.tier(p.life(), p.x.rem_euclid(TAU) / TAU);
            plot(grid, p.x, base * p.y, glyph, tier);
        }
    }
}

impl VisualMode for CircularWave {
    fn kind(&self) -> ModeKind {
        ModeKind::CircularWave
    }

    fn render(&mut self, input: &FrameInput<'_>, grid: &mut FrameGrid) {
        let (w, h) = (grid.width() as i32, grid.height() as i32);
        if w == 0 || h == 0 {
            return;
        }

        let wave = resample(input.waveform, self.points);
        let peak = wave.iter().fold(0.0_f32, |m, v| m.max(v.abs()));
        let scale = 1.0 / peak.max(MIN_NORMALIZE);

        let cx = (w - 1) as f32 / 2.0;
        let cy = (h - 1) as f32 / 2.0;
        // fit the fully modulated ring inside the grid
        let base = ((h as f32 / 2.0 - 1.0) / (ASPECT * (1.0 + MODULATION)))
            .min((w as f32 / 2.0 - 1.0) / (1.0 + MODULATION))
            .max(1.0);

        let energy = input.energy();
        if self.overlays {
            self.sparks.step(f32::MAX, SPARK_MAX_RADIUS);
            self.spawn_sparks(energy);
            self.draw_overlays(input, grid, (cx, cy), base, energy);
        }

        let outline: Vec<(i32, i32)> = wave
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let angle = i as f32 * TAU / self.points as f32;
                let r = base * (1.0 + (v * scale).clamp(-1.0, 1.0) * MODULATION);
                let x = (cx + r * angle.cos()).round() as i32;
                let y = (cy + r * angle.sin() * ASPECT).round() as i32;
                (x.clamp(0, w - 1), y.clamp(0, h - 1))
            })
            .collect();

        for (i, &from) in outline.iter().enumerate() {
            let to = outline[(i + 1) % outline.len()];
            let intensity = (wave[i] * scale).abs().min(1.0);
            let tier = input.scheme.tier(intensity, i as f32 / self.points as f32);
            grid.line(from, to, input.glyphs.orbit, tier);
        }
    }

    fn resize(&mut self, _width: u16, _height: u16) {
        self.sparks.clear();
    }

    fn particle_count(&self) -> usize {
        self.sparks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorScheme;
    use std::collections::{HashSet, VecDeque};

    fn options(overlays: bool) -> ModeOptions {
        ModeOptions {
            circle_points: 180,
            particle_capacity: 64,
            circle_overlays: overlays,
            seed: Some(7),
        }
    }

    fn input<'a>(wave: &'a [f32], spectrum: &'a [f32]) -> FrameInput<'a> {
        FrameInput {
            spectrum,
            peaks: spectrum,
            waveform: wave,
            band_centers: &[],
            elapsed: 1.0,
            dt: 0.016,
            scheme: ColorScheme::Prism,
            glyphs: Glyphs::UNICODE,
        }
    }

    fn connected(cells: &HashSet<(i32, i32)>) -> bool {
        let Some(&start) = cells.iter().next() else {
            return false;
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some((x, y)) = queue.pop_front() {
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let n = (x + dx, y + dy);
                    if cells.contains(&n) && seen.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
        }
        seen.len() == cells.len()
    }

    #[test]
    fn point_count_never_drops_below_minimum() {
        let mode = CircularWave::new(&ModeOptions {
            circle_points: 20,
            ..options(false)
        });
        assert_eq!(mode.points(), MIN_CIRCLE_POINTS);
    }

    #[test]
    fn outline_is_connected() {
        let wave: Vec<f32> = (0..97).map(|i| (i as f32 * 0.7).sin()).collect();
        let mut mode = CircularWave::new(&options(false));
        for (w, h) in [(10u16, 5u16), (40, 12), (80, 24), (133, 41), (200, 60)] {
            let mut grid = FrameGrid::new(w, h);
            mode.render(&input(&wave, &[]), &mut grid);
            let cells: HashSet<_> = grid
                .cells()
                .filter(|(_, _, c)| c.glyph == '•')
                .map(|(r, c, _)| (c as i32, r as i32))
                .collect();
            assert!(cells.len() > 4, "{w}x{h}");
            assert!(connected(&cells), "gap in outline at {w}x{h}");
        }
    }

    #[test]
    fn loud_input_spawns_orbit_sparks() {
        let wave = vec![0.0; 64];
        let loud = vec![0.9; 32];
        let mut mode = CircularWave::new(&options(true));
        let mut grid = FrameGrid::new(80, 24);
        mode.render(&input(&wave, &loud), &mut grid);
        assert!(mode.spark_count() > 0);

        let mut quiet = CircularWave::new(&options(true));
        quiet.render(&input(&wave, &[0.0; 32]), &mut grid);
        assert_eq!(quiet.spark_count(), 0);
    }
}
