mod action;
mod app;
mod capture;
mod cli;
mod terminal;
mod toast;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use wavetty_core::{platform, Config, SampleBuffer, SourceKind};

use crate::capture::Capture;
use crate::cli::Cli;
use crate::terminal::{TerminalGuard, TerminalSurface};
use crate::toast::Severity;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        return print_devices();
    }

    let log_path = init_logging()?;
    // Print log path to stderr so it can be tailed while the screen is taken.
    eprintln!("wavetty log: {}", log_path.display());
    info!("wavetty starting");

    // ── Load config ──────────────────────────────────────────────────────────
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let mut config = load_config(&config_path);
    cli.apply(&mut config);
    let config = config.sanitized();

    // ── Audio source ─────────────────────────────────────────────────────────
    let buffer = SampleBuffer::with_duration(config.audio.buffer_seconds, config.audio.sample_rate);
    let capture = capture::start(&config.audio, &buffer).context("could not start audio capture")?;
    info!("capturing from {} ({} source)", capture.description(), capture.kind());

    // ── Run TUI ──────────────────────────────────────────────────────────────
    terminal::install_panic_hook();
    let mut guard = TerminalGuard::enter().context("could not set up the terminal")?;
    let result = run(config, config_path, buffer, &capture).await;
    guard.restore();
    drop(capture);

    if let Err(e) = &result {
        error!("wavetty exited with error: {:#}", e);
    } else {
        info!("wavetty stopped");
    }
    result
}

async fn run(config: Config, config_path: PathBuf, buffer: SampleBuffer, capture: &Capture) -> anyhow::Result<()> {
    let fell_back = capture.kind() == SourceKind::Demo && config.audio.source != SourceKind::Demo;
    let mut surface = TerminalSurface::new().context("could not read the terminal size")?;
    let mut app = app::App::new(config, config_path, buffer);
    if fell_back {
        app.announce("no audio device; playing the demo signal", Severity::Warning);
    } else {
        app.announce(format!("source: {}", capture.description()), Severity::Info);
    }
    app.run(&mut surface).await
}

/// Log to a file: stdout is the display.
fn init_logging() -> anyhow::Result<PathBuf> {
    let log_path = platform::log_path();
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("could not create {}", dir.display()))?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("could not open {}", log_path.display()))?;

    // RUST_LOG overrides the default level.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();
    Ok(log_path)
}

/// A broken config file should not keep the visualizer from starting.
fn load_config(path: &Path) -> Config {
    match Config::load_from(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("could not load {}: {}; using defaults", path.display(), e);
            eprintln!("wavetty: {}; using defaults", e);
            Config::default()
        }
    }
}

fn print_devices() -> anyhow::Result<()> {
    let devices = capture::cpal_source::list_devices()?;
    if devices.is_empty() {
        println!("no input devices found");
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        match device.default_config {
            Some((channels, rate, format)) => {
                println!("{} {}  ({} ch, {} Hz, {})", marker, device.name, channels, rate, format)
            }
            None => println!("{} {}", marker, device.name),
        }
    }
    if capture::pulse::AVAILABLE {
        println!(
            "  {}  (PulseAudio monitor of the default output, --source pulse)",
            capture::pulse::DEFAULT_MONITOR
        );
    }
    Ok(())
}
