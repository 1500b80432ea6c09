//! Audio capture backends. Each one feeds mono samples into the shared
//! [`SampleBuffer`] from its own thread (or the audio driver's callback).
//!
//! Dropping a [`Capture`] stops its source. If a source dies on its own the
//! buffer simply stops advancing and goes stale, which the render loop reads
//! as silence.

pub mod cpal_source;
pub mod demo;
pub mod pulse;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use wavetty_core::config::AudioConfig;
use wavetty_core::{SampleBuffer, SourceKind};

/// A running audio source. Keep it alive for as long as samples are wanted.
pub struct Capture {
    description: String,
    kind: SourceKind,
    _handle: SourceHandle,
}

enum SourceHandle {
    Stream(cpal::Stream),
    Thread(WorkerThread),
}

impl Capture {
    fn new(kind: SourceKind, description: impl Into<String>, handle: SourceHandle) -> Self {
        Self {
            description: description.into(),
            kind,
            _handle: handle,
        }
    }

    /// Human-readable name of what is being captured.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The concrete backend; never [`SourceKind::Auto`].
    pub fn kind(&self) -> SourceKind {
        self.kind
    }
}

/// A producer thread with a cooperative stop flag.
pub(crate) struct WorkerThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    pub(crate) fn spawn<F>(name: &str, body: F) -> anyhow::Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(flag))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Ask the thread to stop without waiting for it.
    #[cfg_attr(not(all(feature = "pulse", target_os = "linux")), allow(dead_code))]
    pub(crate) fn detach(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.take();
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Sleep for `total`, waking early if `stop` is raised. Returns true when
/// stopped.
#[cfg_attr(not(all(feature = "pulse", target_os = "linux")), allow(dead_code))]
pub(crate) fn sleep_unless_stopped(stop: &AtomicBool, total: Duration) -> bool {
    let deadline = Instant::now() + total;
    while Instant::now() < deadline {
        if stop.load(Ordering::Relaxed) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50).min(deadline - Instant::now()));
    }
    stop.load(Ordering::Relaxed)
}

/// Start the configured source. `auto` tries the PulseAudio monitor, then
/// the default input device, then falls back to the demo generator.
pub fn start(audio: &AudioConfig, buffer: &SampleBuffer) -> anyhow::Result<Capture> {
    let device = audio.device.as_deref();
    let rate = audio.sample_rate;
    match audio.source {
        SourceKind::Demo => demo::start(rate, buffer),
        SourceKind::Cpal => cpal_source::start(device, rate, buffer),
        SourceKind::Pulse => pulse::start(device, rate, buffer),
        SourceKind::Auto => {
            if pulse::AVAILABLE {
                match pulse::start(device, rate, buffer) {
                    Ok(capture) => return Ok(capture),
                    Err(e) => warn!("pulse monitor unavailable: {:#}", e),
                }
            }
            match cpal_source::start(device, rate, buffer) {
                Ok(capture) => return Ok(capture),
                Err(e) => warn!("input device unavailable: {:#}", e),
            }
            info!("no capture device; using the demo signal");
            demo::start(rate, buffer)
        }
    }
}
