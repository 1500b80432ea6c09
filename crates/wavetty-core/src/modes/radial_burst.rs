//! Radial burst: energy spokes around the center leave a fading afterglow,
//! and sudden rises in level fire star particles outward.

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::Rng;

use super::particles::{Particle, ParticlePool};
use super::{column_values, position, FrameInput, ModeKind, ModeOptions, VisualMode};
use crate::grid::FrameGrid;

const MIN_SPOKES: usize = 24;
const MAX_SPOKES: usize = 120;
/// Vertical squish applied to spokes and particle velocity.
const SQUISH: f32 = 0.6;
const TRAIL_FADE: f32 = 0.85;
const TRAIL_CUTOFF: f32 = 0.02;
/// Weight of the newest frame in the rolling level average.
const AVERAGE_BLEND: f32 = 0.1;
/// Rise above the rolling average that counts as a transient.
const TRANSIENT_THRESHOLD: f32 = 0.01;
const MAX_SPAWN_PER_TICK: usize = 60;

pub struct RadialBurst {
    particles: ParticlePool,
    trail: Vec<f32>,
    size: (u16, u16),
    average: f32,
    rng: StdRng,
}

impl RadialBurst {
    pub fn new(options: &ModeOptions) -> Self {
        Self {
            particles: ParticlePool::new(options.particle_capacity),
            trail: Vec::new(),
            size: (0, 0),
            average: 0.0,
            rng: options.rng(),
        }
    }

    pub fn particles(&self) -> &ParticlePool {
        &self.particles
    }

    /// Rolling average of the overall level.
    pub fn average(&self) -> f32 {
        self.average
    }

    fn spawn(&mut self, center: (f32, f32), energy: f32, transient: f32) -> usize {
        let mut count = 0;
        if transient > TRANSIENT_THRESHOLD {
            count = ((transient * 80.0).ceil() as usize).clamp(1, MAX_SPAWN_PER_TICK);
        }
        // a little ambient sparkle on sustained sound
        if self.rng.gen::<f32>() < energy * 1.5 {
            count += 1;
        }

        let mut spawned = 0;
        for _ in 0..count.min(MAX_SPAWN_PER_TICK) {
            let angle = self.rng.gen_range(0.0..TAU);
            let speed = 0.4 + self.rng.gen::<f32>() * 1.2 * (0.5 + transient * 6.0).min(2.5);
            let ttl = self.rng.gen_range(12..30);
            let p = Particle::new(
                center.0,
                center.1,
                angle.cos() * speed,
                angle.sin() * speed * SQUISH,
                ttl,
            );
            if !self.particles.spawn(p) {
                break;
            }
            spawned += 1;
        }
        spawned
    }

    fn paint_spokes(&mut self, spectrum: &[f32], w: usize, h: usize) {
        let spokes = (((w + h) as f32 * 0.8) as usize).clamp(MIN_SPOKES, MAX_SPOKES);
        let values = column_values(spectrum, spokes);
        let cx = (w / 2) as f32;
        let cy = (h / 2) as f32;
        let max_r = ((w / 2) as f32 - 1.0).min(((h / 2) as f32 - 1.0) / SQUISH);
        if max_r <= 0.0 {
            return;
        }

        for (i, &v) in values.iter().enumerate() {
            let r = (v.clamp(0.0, 1.0).powf(0.6) * max_r) as usize;
            let angle = i as f32 * TAU / spokes as f32;
            let (dx, dy) = (angle.cos(), angle.sin() * SQUISH);
            for step in 0..r {
                let x = (cx + dx * step as f32) as i32;
                let y = (cy + dy * step as f32) as i32;
                if x < 0 || y < 0 || x as usize >= w || y as usize >= h {
                    continue;
                }
                let brightness = 0.4 + 0.6 * step as f32 / r.saturating_sub(1).max(1) as f32;
                let cell = &mut self.trail[y as usize * w + x as usize];
                *cell = cell.max(brightness);
            }
        }
    }
}

fn trail_glyph(set: &[char], brightness: f32) -> char {
    let idx = if brightness > 0.75 {
        0
    } else if brightness > 0.5 {
        1
    } else if brightness > 0.3 {
        2
    } else {
        3
    };
    set.get(idx).or(set.last()).copied().unwrap_or('.')
}

impl VisualMode for RadialBurst {
    fn kind(&self) -> ModeKind {
        ModeKind::RadialBurst
    }

    fn render(&mut self, input: &FrameInput<'_>, grid: &mut FrameGrid) {
        if grid.size() != self.size {
            let (w, h) = grid.size();
            self.resize(w, h);
        }
        let (w, h) = (grid.width() as usize, grid.height() as usize);
        if w < 10 || h < 6 {
            return;
        }

        let energy = input.energy();
        let transient = (energy - self.average).max(0.0);
        self.average += AVERAGE_BLEND * (energy - self.average);

        for b in self.trail.iter_mut() {
            *b *= TRAIL_FADE;
        }
        self.paint_spokes(input.spectrum, w, h);

        let center = ((w / 2) as f32, (h / 2) as f32);
        self.particles.step(w as f32, h as f32);
        self.spawn(center, energy, transient);

        for (i, &b) in self.trail.iter().enumerate() {
            if b <= TRAIL_CUTOFF {
                continue;
            }
            let (x, y) = (i % w, i / w);
            let tier = input.scheme.tier(b, position(x, w));
            grid.set(x as i32, y as i32, trail_glyph(input.glyphs.trail, b), tier);
        }

        for p in self.particles.iter() {
            let twinkle = 0.6 + 0.4 * (p.age as f32 * 0.6 + p.x * 0.2).sin();
            let intensity = (p.life() * twinkle).min(1.0);
            let tier = input.scheme.tier(intensity, p.x / (w - 1) as f32);
            let glyph = trail_glyph(input.glyphs.spark, intensity);
            grid.set(p.x as i32, p.y as i32, glyph, tier);
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.size = (width, height);
        self.trail = vec![0.0; width as usize * height as usize];
        self.particles.clear();
    }

    fn particle_count(&self) -> usize {
        self.particles.len()
    }
}
