//! PulseAudio / PipeWire monitor capture.
//!
//! Records the monitor of the default sink, i.e. whatever the system is
//! playing, as mono S16. The connection is retried with a back-off if the
//! server goes away. Only built with the `pulse` feature on Linux.

#[cfg(all(feature = "pulse", target_os = "linux"))]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(all(feature = "pulse", target_os = "linux"))]
use std::time::Duration;

use wavetty_core::SampleBuffer;

use super::Capture;

/// Whether this build can capture from PulseAudio at all.
pub const AVAILABLE: bool = cfg!(all(feature = "pulse", target_os = "linux"));

/// PulseAudio's alias for the monitor source of the default sink.
pub const DEFAULT_MONITOR: &str = "@DEFAULT_MONITOR@";

#[cfg(all(feature = "pulse", target_os = "linux"))]
const FRAGMENT_SAMPLES: usize = 1024;
#[cfg(all(feature = "pulse", target_os = "linux"))]
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
#[cfg(all(feature = "pulse", target_os = "linux"))]
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Convert native-endian S16 bytes to samples in [-1, 1). A trailing odd
/// byte is ignored.
#[cfg_attr(not(all(feature = "pulse", target_os = "linux")), allow(dead_code))]
pub fn decode_s16(bytes: &[u8], out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        bytes
            .chunks_exact(2)
            .map(|b| i16::from_ne_bytes([b[0], b[1]]) as f32 / 32768.0),
    );
}

#[cfg(all(feature = "pulse", target_os = "linux"))]
fn connect(device: &str, rate: u32) -> anyhow::Result<libpulse_simple_binding::Simple> {
    use libpulse_binding::{
        def::BufferAttr,
        sample::{Format, Spec},
        stream::Direction,
    };
    use libpulse_simple_binding::Simple;

    let spec = Spec {
        format: Format::S16NE,
        channels: 1,
        rate,
    };
    if !spec.is_valid() {
        anyhow::bail!("invalid sample spec ({} Hz mono s16)", rate);
    }

    let attrs = BufferAttr {
        maxlength: (FRAGMENT_SAMPLES * 8) as u32,
        fragsize: (FRAGMENT_SAMPLES * 2) as u32,
        ..Default::default()
    };

    Simple::new(
        None,
        "wavetty",
        Direction::Record,
        Some(device),
        "visualizer",
        &spec,
        None,
        Some(&attrs),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))
}

#[cfg(all(feature = "pulse", target_os = "linux"))]
fn read_loop(
    simple: &libpulse_simple_binding::Simple,
    buffer: &SampleBuffer,
    stop: &AtomicBool,
) -> anyhow::Result<()> {
    let mut bytes = vec![0u8; FRAGMENT_SAMPLES * 2];
    let mut samples = Vec::with_capacity(FRAGMENT_SAMPLES);
    while !stop.load(Ordering::Relaxed) {
        simple
            .read(&mut bytes)
            .map_err(|e| anyhow::anyhow!("read failed: {}", e))?;
        decode_s16(&bytes, &mut samples);
        buffer.push(&samples);
    }
    Ok(())
}

#[cfg(all(feature = "pulse", target_os = "linux"))]
pub fn start(device: Option<&str>, rate: u32, buffer: &SampleBuffer) -> anyhow::Result<Capture> {
    use tracing::{debug, info, warn};
    use wavetty_core::SourceKind;

    use super::{sleep_unless_stopped, SourceHandle, WorkerThread};

    let device_name = device.unwrap_or(DEFAULT_MONITOR).to_string();
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), String>>();
    buffer.set_sample_rate(rate);
    let buffer = buffer.clone();
    let thread_device = device_name.clone();

    let worker = WorkerThread::spawn("wavetty-pulse", move |stop| {
        let mut ready = Some(ready_tx);
        loop {
            match connect(&thread_device, rate) {
                Ok(simple) => {
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Ok(()));
                    } else {
                        info!("pulse capture reconnected to {}", thread_device);
                    }
                    match read_loop(&simple, &buffer, &stop) {
                        Ok(()) => break,
                        Err(e) => warn!("pulse capture error: {:#}", e),
                    }
                }
                Err(e) => {
                    // the first failure is reported to the caller instead
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(format!("{:#}", e)));
                        return;
                    }
                    warn!("pulse reconnect to {} failed: {:#}", thread_device, e);
                }
            }
            if sleep_unless_stopped(&stop, RECONNECT_DELAY) {
                break;
            }
        }
        debug!("pulse capture thread exiting");
    })?;

    match ready_rx.recv_timeout(CONNECT_TIMEOUT) {
        Ok(Ok(())) => {
            info!("pulse capture on {} ({} Hz)", device_name, rate);
            Ok(Capture::new(
                SourceKind::Pulse,
                format!("{} ({} Hz)", device_name, rate),
                SourceHandle::Thread(worker),
            ))
        }
        Ok(Err(e)) => Err(anyhow::anyhow!("could not record from {}: {}", device_name, e)),
        Err(_) => {
            worker.detach();
            Err(anyhow::anyhow!("timed out connecting to PulseAudio"))
        }
    }
}

#[cfg(not(all(feature = "pulse", target_os = "linux")))]
pub fn start(_device: Option<&str>, _rate: u32, _buffer: &SampleBuffer) -> anyhow::Result<Capture> {
    anyhow::bail!("built without PulseAudio support (enable the `pulse` feature on Linux)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_native_endian_s16() {
        let mut bytes = Vec::new();
        for s in [0i16, 16384, -32768, 32767] {
            bytes.extend_from_slice(&s.to_ne_bytes());
        }
        bytes.push(0xff);
        let mut out = Vec::new();
        decode_s16(&bytes, &mut out);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.5);
        assert_eq!(out[2], -1.0);
        assert!(out[3] < 1.0 && out[3] > 0.999);
    }
}
