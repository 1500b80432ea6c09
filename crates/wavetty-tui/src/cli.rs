use std::path::PathBuf;

use clap::Parser;

use wavetty_core::{ColorScheme, Config, EqStrength, ModeKind, SourceKind};

/// Real-time audio visualizer for the terminal.
///
/// Keys: space = next mode, enter = next color scheme, w = cycle EQ,
/// b = ASCII glyphs, s = save settings, q / esc = quit.
#[derive(Debug, Parser)]
#[command(name = "wavetty", version, about)]
pub struct Cli {
    /// Visualization mode (bars, spectrum, waveform, mirror_circular,
    /// circular_wave, levels, radial_burst)
    #[arg(short, long)]
    pub mode: Option<ModeKind>,

    /// Color scheme (multicolor, blue, green, red, rainbow, fire, prism,
    /// heat, ocean)
    #[arg(short, long)]
    pub color: Option<ColorScheme>,

    /// Frequency equalization (off, medium, strong)
    #[arg(long)]
    pub eq: Option<EqStrength>,

    /// Use only ASCII glyphs
    #[arg(long)]
    pub ascii: bool,

    /// Audio source (auto, cpal, pulse, demo)
    #[arg(short, long)]
    pub source: Option<SourceKind>,

    /// Capture device name
    #[arg(short, long)]
    pub device: Option<String>,

    /// Number of frequency bands
    #[arg(long)]
    pub bands: Option<usize>,

    /// Target frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the available capture devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

impl Cli {
    /// Apply flag overrides for this run. Nothing here is saved unless the
    /// user saves from inside the app.
    pub fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.display.mode = mode;
        }
        if let Some(scheme) = self.color {
            config.display.color_scheme = scheme;
        }
        if let Some(eq) = self.eq {
            config.display.eq = eq;
        }
        if self.ascii {
            config.display.ascii = true;
        }
        if let Some(source) = self.source {
            config.audio.source = source;
        }
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(bands) = self.bands {
            config.analyzer.bands = bands;
        }
        if let Some(fps) = self.fps {
            config.display.fps = fps;
        }
    }
}
