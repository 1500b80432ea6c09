//! Fixed-capacity particle pool.
//!
//! Slots are allocated once at construction. Spawning takes a free slot
//! (or is refused when none is left), so per-tick work is bounded by the
//! capacity no matter how loud the input gets.

/// One particle, in grid cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Ticks lived so far.
    pub age: u32,
    /// Ticks to live.
    pub ttl: u32,
}

impl Particle {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, ttl: u32) -> Self {
        Self {
            x,
            y,
            vx,
            vy,
            age: 0,
            ttl,
        }
    }

    /// 1.0 when fresh, falling to 0.0 at end of life.
    pub fn life(&self) -> f32 {
        if self.ttl == 0 {
            return 0.0;
        }
        1.0 - (self.age as f32 / self.ttl as f32).min(1.0)
    }

    fn in_bounds(&self, width: f32, height: f32) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.x < width && self.y < height
    }
}

#[derive(Debug, Clone)]
pub struct ParticlePool {
    slots: Vec<Option<Particle>>,
    free: Vec<usize>,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            // popped from the back, so low slots fill first
            free: (0..capacity).rev().collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a particle. Returns false when the pool is full.
    pub fn spawn(&mut self, particle: Particle) -> bool {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(particle);
                true
            }
            None => false,
        }
    }

    /// Advance every particle one tick and retire those past their ttl or
    /// outside `width` x `height`. Returns how many were retired.
    pub fn step(&mut self, width: f32, height: f32) -> usize {
        let mut retired = 0;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let Some(p) = slot else { continue };
            p.x += p.vx;
            p.y += p.vy;
            p.age += 1;
            if p.age >= p.ttl || !p.in_bounds(width, height) {
                *slot = None;
                self.free.push(idx);
                retired += 1;
            }
        }
        retired
    }

    pub fn clear(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.take().is_some() {
                self.free.push(idx);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_is_refused_when_full() {
        let mut pool = ParticlePool::new(2);
        assert!(pool.spawn(Particle::new(1.0, 1.0, 0.0, 0.0, 5)));
        assert!(pool.spawn(Particle::new(1.0, 1.0, 0.0, 0.0, 5)));
        assert!(!pool.spawn(Particle::new(1.0, 1.0, 0.0, 0.0, 5)));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn particles_expire_after_ttl() {
        let mut pool = ParticlePool::new(4);
        pool.spawn(Particle::new(5.0, 5.0, 0.0, 0.0, 3));
        assert_eq!(pool.step(10.0, 10.0), 0);
        assert_eq!(pool.step(10.0, 10.0), 0);
        assert_eq!(pool.step(10.0, 10.0), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn particles_leaving_the_grid_are_retired_and_slots_reused() {
        let mut pool = ParticlePool::new(1);
        pool.spawn(Particle::new(9.5, 5.0, 1.0, 0.0, 100));
        assert_eq!(pool.step(10.0, 10.0), 1);
        assert!(pool.spawn(Particle::new(1.0, 1.0, 0.0, 0.0, 1)));
    }

    #[test]
    fn life_fades_with_age() {
        let mut p = Particle::new(0.0, 0.0, 0.0, 0.0, 4);
        assert_eq!(p.life(), 1.0);
        p.age = 2;
        assert_eq!(p.life(), 0.5);
    }
}
