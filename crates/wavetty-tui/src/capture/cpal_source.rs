//! Input capture through cpal (ALSA, CoreAudio, WASAPI).

use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tracing::{info, warn};

use wavetty_core::{SampleBuffer, SourceKind};

use super::{Capture, SourceHandle};

/// An input device as listed by `--list-devices`.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
    /// `(channels, rate, format)` of the device's default input config.
    pub default_config: Option<(u16, u32, String)>,
}

pub fn list_devices() -> anyhow::Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    let devices = host
        .input_devices()
        .context("could not enumerate input devices")?;

    Ok(devices
        .filter_map(|device| {
            let name = device.name().ok()?;
            let default_config = device.default_input_config().ok().map(|c| {
                (c.channels(), c.sample_rate().0, format!("{:?}", c.sample_format()))
            });
            Some(DeviceInfo {
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                default_config,
            })
        })
        .collect())
}

fn find_device(host: &cpal::Host, name: Option<&str>) -> anyhow::Result<cpal::Device> {
    let Some(wanted) = name else {
        return host
            .default_input_device()
            .ok_or_else(|| anyhow!("no default input device"));
    };
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .context("could not enumerate input devices")?
        .collect();
    // exact match first, then a case-insensitive substring
    let lower = wanted.to_lowercase();
    let mut fallback = None;
    for device in devices {
        let Ok(device_name) = device.name() else {
            continue;
        };
        if device_name == wanted {
            return Ok(device);
        }
        if fallback.is_none() && device_name.to_lowercase().contains(&lower) {
            fallback = Some(device);
        }
    }
    fallback.ok_or_else(|| anyhow!("no input device named '{}'", wanted))
}

/// Use `requested` Hz if the device supports it in its default sample
/// format, otherwise the device default.
fn select_config(device: &cpal::Device, requested: u32) -> anyhow::Result<(StreamConfig, SampleFormat)> {
    let default = device
        .default_input_config()
        .context("device has no default input config")?;
    let format = default.sample_format();

    if let Ok(ranges) = device.supported_input_configs() {
        for range in ranges {
            if range.sample_format() == format
                && range.channels() == default.channels()
                && range.min_sample_rate().0 <= requested
                && range.max_sample_rate().0 >= requested
            {
                return Ok((range.with_sample_rate(SampleRate(requested)).config(), format));
            }
        }
    }
    Ok((default.config(), format))
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    buffer: SampleBuffer,
) -> anyhow::Result<cpal::Stream> {
    let channels = config.channels as usize;
    let err_fn = |err: cpal::StreamError| warn!("audio stream error: {}", err);

    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| buffer.push_interleaved(data, channels),
            err_fn,
            None,
        )?,
        SampleFormat::I16 => {
            let mut scratch = Vec::new();
            device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| s as f32 / 32768.0));
                    buffer.push_interleaved(&scratch, channels);
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            let mut scratch = Vec::new();
            device.build_input_stream(
                config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    scratch.clear();
                    scratch.extend(data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0));
                    buffer.push_interleaved(&scratch, channels);
                },
                err_fn,
                None,
            )?
        }
        other => return Err(anyhow!("unsupported input sample format: {:?}", other)),
    };
    Ok(stream)
}

pub fn start(device: Option<&str>, requested_rate: u32, buffer: &SampleBuffer) -> anyhow::Result<Capture> {
    let host = cpal::default_host();
    let device = find_device(&host, device)?;
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let (config, format) = select_config(&device, requested_rate)?;

    buffer.set_sample_rate(config.sample_rate.0);
    let stream = build_stream(&device, &config, format, buffer.clone())
        .with_context(|| format!("could not open input stream on '{}'", name))?;
    stream.play().context("failed to start input stream")?;

    info!(
        "cpal capture on '{}' ({} ch @ {} Hz, {:?})",
        name, config.channels, config.sample_rate.0, format
    );
    Ok(Capture::new(
        SourceKind::Cpal,
        format!("{} ({} Hz)", name, config.sample_rate.0),
        SourceHandle::Stream(stream),
    ))
}
