//! Synthetic source: four octaves of A with slowly drifting levels and a
//! little noise. Used with `--source demo` or when no device opens.

use std::f32::consts::TAU;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use wavetty_core::{SampleBuffer, SourceKind};

use super::{Capture, SourceHandle, WorkerThread};

const TONES_HZ: [f32; 4] = [220.0, 440.0, 880.0, 1760.0];
const NOISE: f32 = 0.1;

pub struct DemoSignal {
    rate: u32,
    position: u64,
    rng: StdRng,
}

impl DemoSignal {
    pub fn new(rate: u32, rng: StdRng) -> Self {
        Self {
            rate: rate.max(1),
            position: 0,
            rng,
        }
    }

    /// Seconds of signal produced so far.
    pub fn elapsed(&self) -> f32 {
        (self.position as f64 / self.rate as f64) as f32
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        let rate = self.rate as f64;
        for sample in out.iter_mut() {
            // f64 phase keeps the tones clean over long runs
            let t = self.position as f64 / rate;
            let mut value = 0.0_f32;
            for &freq in &TONES_HZ {
                let level = 0.1 + 0.3 * ((t as f32) * 0.5 + freq * 0.001).sin().abs();
                let phase = ((freq as f64 * t).fract() as f32) * TAU;
                value += level * phase.sin();
            }
            value += NOISE * (self.rng.gen::<f32>() - 0.5);
            *sample = value.clamp(-1.0, 1.0);
            self.position += 1;
        }
    }
}

pub fn start(rate: u32, buffer: &SampleBuffer) -> anyhow::Result<Capture> {
    buffer.set_sample_rate(rate);
    let buffer = buffer.clone();
    let worker = WorkerThread::spawn("wavetty-demo", move |stop| {
        let mut signal = DemoSignal::new(rate, StdRng::from_entropy());
        // 10 ms per wakeup
        let chunk = (rate as usize / 100).max(1);
        let period = Duration::from_secs_f64(chunk as f64 / rate as f64);
        let mut samples = vec![0.0; chunk];
        let mut next = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            signal.fill(&mut samples);
            buffer.push(&samples);
            // pace against the clock, not the sleep, so the rate never drifts
            next += period;
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            } else {
                next = now;
            }
        }
        debug!("demo source stopped after {:.1}s", signal.elapsed());
    })?;

    info!("demo signal at {} Hz", rate);
    Ok(Capture::new(
        SourceKind::Demo,
        format!("demo signal ({} Hz)", rate),
        SourceHandle::Thread(worker),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavetty_core::{AnalyzerConfig, EqStrength, SampleWindow, SpectralAnalyzer};

    fn signal(seed: u64) -> DemoSignal {
        DemoSignal::new(44100, StdRng::seed_from_u64(seed))
    }

    #[test]
    fn output_is_bounded_and_audible() {
        let mut demo = signal(1);
        let mut out = vec![0.0; 8820];
        demo.fill(&mut out);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
        let peak = out.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.2);
        assert!((demo.elapsed() - 0.2).abs() < 1e-3);
    }

    #[test]
    fn same_seed_same_signal() {
        let mut a = signal(5);
        let mut b = signal(5);
        let mut out_a = vec![0.0; 1000];
        let mut out_b = vec![0.0; 1000];
        a.fill(&mut out_a);
        b.fill(&mut out_b);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn tones_show_up_in_their_bands() {
        let mut demo = signal(3);
        let mut out = vec![0.0; 2048];
        demo.fill(&mut out);
        let mut analyzer = SpectralAnalyzer::new(&AnalyzerConfig::default(), 44100);
        let analysis = analyzer.analyze(&SampleWindow::from_samples(out, 44100), EqStrength::Off, 16);

        let layout = analyzer.layout();
        let at = |hz: f32| analysis.bands.values[layout.band_for(hz).unwrap()];
        let quiet = analysis.bands.values[layout.band_for(8000.0).unwrap()];
        for hz in TONES_HZ {
            assert!(at(hz) > quiet, "{hz} Hz should stand above the noise");
        }
    }
}
