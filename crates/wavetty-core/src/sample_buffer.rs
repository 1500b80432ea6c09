//! Sample buffer: bounded, latest-wins store of the newest mono samples.
//!
//! The audio source (cpal callback, PulseAudio reader thread or the demo
//! generator) pushes into a clone of [`SampleBuffer`]; the render loop takes a
//! [`SampleWindow`] snapshot once per tick. Both sides go through one mutex,
//! so a snapshot never observes a half-written chunk. When the producer runs
//! ahead of the consumer the oldest samples are dropped.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

/// Read-only snapshot of the newest samples, handed to the analyzer each tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    /// Mono samples in [-1, 1], oldest first.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Arrival time of the newest sample. `None` for a silent window.
    pub newest: Option<Instant>,
}

impl SampleWindow {
    /// An empty window; the analyzer renders it as silence.
    pub fn silent(sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            newest: None,
        }
    }

    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            newest: Some(Instant::now()),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Absolute peak amplitude.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
    }
}

struct Ring {
    samples: VecDeque<f32>,
    capacity: usize,
    sample_rate: u32,
    total_written: u64,
    last_write: Option<Instant>,
}

/// Shared ring of mono samples. Cloning shares the same storage.
#[derive(Clone)]
pub struct SampleBuffer {
    inner: Arc<Mutex<Ring>>,
}

impl SampleBuffer {
    pub fn new(capacity: usize, sample_rate: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(Ring {
                samples: VecDeque::with_capacity(capacity),
                capacity,
                sample_rate,
                total_written: 0,
                last_write: None,
            })),
        }
    }

    /// Buffer holding `seconds` of audio at `sample_rate`.
    pub fn with_duration(seconds: f32, sample_rate: u32) -> Self {
        let capacity = (seconds.max(0.05) * sample_rate as f32).ceil() as usize;
        Self::new(capacity, sample_rate)
    }

    // A panicking producer must not take the visualization down with it.
    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().sample_rate
    }

    /// Called by a source once it knows the rate its device actually runs at.
    pub fn set_sample_rate(&self, sample_rate: u32) {
        let mut ring = self.lock();
        if ring.sample_rate != sample_rate {
            debug!(
                "sample buffer rate {} -> {} Hz, dropping {} samples",
                ring.sample_rate,
                sample_rate,
                ring.samples.len()
            );
            ring.sample_rate = sample_rate;
            ring.samples.clear();
        }
    }

    /// Append mono samples. Non-finite values become 0, the rest are clamped
    /// to [-1, 1].
    pub fn push(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let mut ring = self.lock();
        let capacity = ring.capacity;
        let tail = &samples[samples.len().saturating_sub(capacity)..];
        let overflow = (ring.samples.len() + tail.len()).saturating_sub(capacity);
        if overflow > 0 {
            ring.samples.drain(..overflow);
        }
        ring.samples.extend(tail.iter().map(|&s| sanitize(s)));
        ring.total_written += samples.len() as u64;
        ring.last_write = Some(Instant::now());
    }

    /// Append interleaved frames, downmixing each frame to mono by averaging
    /// its channels.
    pub fn push_interleaved(&self, data: &[f32], channels: usize) {
        if channels <= 1 {
            self.push(data);
            return;
        }
        let mono: Vec<f32> = data
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        self.push(&mono);
    }

    /// Total samples ever pushed (mono). Lets callers tell "no new data".
    pub fn total_written(&self) -> u64 {
        self.lock().total_written
    }

    pub fn clear(&self) {
        let mut ring = self.lock();
        ring.samples.clear();
        ring.last_write = None;
    }

    /// The newest `len` samples (fewer if the buffer holds less).
    ///
    /// A buffer whose producer has been quiet for longer than `stale_after`
    /// yields a silent window, so a stalled or disconnected source decays
    /// the display instead of freezing it.
    pub fn snapshot(&self, len: usize, stale_after: Duration) -> SampleWindow {
        self.snapshot_at(len, stale_after, Instant::now())
    }

    pub fn snapshot_at(&self, len: usize, stale_after: Duration, now: Instant) -> SampleWindow {
        let ring = self.lock();
        let fresh = ring
            .last_write
            .is_some_and(|t| now.saturating_duration_since(t) <= stale_after);
        if !fresh {
            return SampleWindow::silent(ring.sample_rate);
        }
        let skip = ring.samples.len().saturating_sub(len);
        SampleWindow {
            samples: ring.samples.iter().skip(skip).copied().collect(),
            sample_rate: ring.sample_rate,
            newest: ring.last_write,
        }
    }
}

fn sanitize(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
