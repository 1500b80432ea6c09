use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::warn;

use crate::analyzer::{AnalyzerConfig, EqStrength};
use crate::color::ColorScheme;
use crate::engine::ControlSnapshot;
use crate::error::{ConfigError, ParseNameError};
use crate::modes::{ModeKind, ModeOptions, MIN_CIRCLE_POINTS};
use crate::platform;
use crate::smoothing::SmoothingConfig;

pub const MIN_FPS: u32 = 10;
pub const MAX_FPS: u32 = 240;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub modes: ModesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub mode: ModeKind,
    #[serde(default)]
    pub color_scheme: ColorScheme,
    #[serde(default)]
    pub eq: EqStrength,
    /// Restrict glyphs to ASCII for terminals without block characters.
    #[serde(default)]
    pub ascii: bool,
    /// Show a short notice when a setting changes.
    #[serde(default = "default_true")]
    pub toasts: bool,
}

/// Where samples come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// PulseAudio monitor if available, then the default input device, then
    /// the demo generator.
    #[default]
    Auto,
    Cpal,
    Pulse,
    Demo,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Auto,
        SourceKind::Cpal,
        SourceKind::Pulse,
        SourceKind::Demo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Auto => "auto",
            SourceKind::Cpal => "cpal",
            SourceKind::Pulse => "pulse",
            SourceKind::Demo => "demo",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ParseNameError::new("audio source", s, &Self::ALL.map(SourceKind::name)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub source: SourceKind,
    /// Capture device name; the backend's default when unset.
    #[serde(default)]
    pub device: Option<String>,
    /// Requested rate. Backends may run at a different one and report it.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: f32,
    /// A source silent for this long is treated as disconnected.
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModesConfig {
    #[serde(default = "default_circle_points")]
    pub circle_points: usize,
    #[serde(default = "default_particle_capacity")]
    pub particle_capacity: usize,
    #[serde(default = "default_true")]
    pub circle_overlays: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            mode: ModeKind::default(),
            color_scheme: ColorScheme::default(),
            eq: EqStrength::default(),
            ascii: false,
            toasts: default_true(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            device: None,
            sample_rate: default_sample_rate(),
            buffer_seconds: default_buffer_seconds(),
            stale_after_ms: default_stale_after_ms(),
        }
    }
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            circle_points: default_circle_points(),
            particle_capacity: default_particle_capacity(),
            circle_overlays: default_true(),
        }
    }
}

fn default_fps() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_buffer_seconds() -> f32 {
    1.0
}

fn default_stale_after_ms() -> u64 {
    250
}

fn default_circle_points() -> usize {
    180
}

fn default_particle_capacity() -> usize {
    512
}

impl Config {
    /// Load from the default location, writing defaults there if missing.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Clamp out-of-range values in place. Returns one note per change.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut notes = Vec::new();

        let fps = self.display.fps.clamp(MIN_FPS, MAX_FPS);
        if fps != self.display.fps {
            notes.push(format!("display.fps {} -> {}", self.display.fps, fps));
            self.display.fps = fps;
        }

        let (analyzer, more) = self.analyzer.sanitized();
        self.analyzer = analyzer;
        notes.extend(more);

        let (smoothing, more) = self.smoothing.sanitized();
        self.smoothing = smoothing;
        notes.extend(more);

        if self.modes.circle_points < MIN_CIRCLE_POINTS {
            notes.push(format!(
                "modes.circle_points {} -> {}",
                self.modes.circle_points, MIN_CIRCLE_POINTS
            ));
            self.modes.circle_points = MIN_CIRCLE_POINTS;
        }
        if self.modes.particle_capacity == 0 {
            notes.push("modes.particle_capacity 0 -> 1".to_string());
            self.modes.particle_capacity = 1;
        }

        if self.audio.sample_rate < 8000 {
            notes.push(format!("audio.sample_rate {} -> 8000", self.audio.sample_rate));
            self.audio.sample_rate = 8000;
        }
        // the buffer must at least hold one analysis window
        let min_seconds = self.analyzer.fft_size as f32 / self.audio.sample_rate as f32;
        if !(self.audio.buffer_seconds >= min_seconds) {
            notes.push(format!(
                "audio.buffer_seconds {} -> {:.3}",
                self.audio.buffer_seconds, min_seconds
            ));
            self.audio.buffer_seconds = min_seconds;
        }

        notes
    }

    /// [`Config::sanitize`], logging each adjustment.
    pub fn sanitized(mut self) -> Self {
        for note in self.sanitize() {
            warn!("config value clamped: {}", note);
        }
        self
    }

    /// Initial control state for the render loop.
    pub fn controls(&self) -> ControlSnapshot {
        ControlSnapshot {
            mode: self.display.mode,
            scheme: self.display.color_scheme,
            eq: self.display.eq,
            ascii: self.display.ascii,
        }
    }

    /// Fold the live control state back in, for saving.
    pub fn apply_controls(&mut self, controls: &ControlSnapshot) {
        self.display.mode = controls.mode;
        self.display.color_scheme = controls.scheme;
        self.display.eq = controls.eq;
        self.display.ascii = controls.ascii;
    }

    pub fn mode_options(&self) -> ModeOptions {
        ModeOptions {
            circle_points: self.modes.circle_points,
            particle_capacity: self.modes.particle_capacity,
            circle_overlays: self.modes.circle_overlays,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.display.fps, 60);
        assert_eq!(config.display.mode, ModeKind::Bars);
        assert_eq!(config.display.color_scheme, ColorScheme::Multicolor);
        assert_eq!(config.display.eq, EqStrength::Medium);
        assert_eq!(config.audio.source, SourceKind::Auto);
        assert_eq!(config.analyzer.bands, 64);
        assert!(config.modes.circle_points >= MIN_CIRCLE_POINTS);
        assert!(Config::config_path().ends_with("wavetty/config.toml"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [display]
            mode = "radial_burst"
            color_scheme = "ocean"

            [analyzer]
            bands = 90
            "#,
        )
        .unwrap();
        assert_eq!(config.display.mode, ModeKind::RadialBurst);
        assert_eq!(config.display.color_scheme, ColorScheme::Ocean);
        assert_eq!(config.display.fps, 60);
        assert_eq!(config.analyzer.bands, 90);
        assert_eq!(config.analyzer.fft_size, 2048);
        assert_eq!(config.smoothing, SmoothingConfig::default());
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let err = toml::from_str::<Config>("[display]\nmode = \"plasma\"\n").unwrap_err();
        assert!(err.to_string().contains("plasma"));
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn saved_controls_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.apply_controls(&ControlSnapshot {
            mode: ModeKind::CircularWave,
            scheme: ColorScheme::Prism,
            eq: EqStrength::Off,
            ascii: true,
        });
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.controls(), config.controls());
    }

    #[test]
    fn sanitize_clamps_inconsistent_values() {
        let mut config = Config::default();
        config.display.fps = 1000;
        config.modes.circle_points = 40;
        config.analyzer.fft_size = 3000;
        config.smoothing.waveform_alpha = 1.0;
        config.audio.buffer_seconds = 0.0;
        let notes = config.sanitize();
        assert_eq!(config.display.fps, MAX_FPS);
        assert_eq!(config.modes.circle_points, MIN_CIRCLE_POINTS);
        assert_eq!(config.analyzer.fft_size, 4096);
        assert_eq!(config.smoothing.waveform_alpha, 0.99);
        assert!(config.audio.buffer_seconds * 44100.0 >= 4096.0 - 1.0);
        assert_eq!(notes.len(), 5);
        assert!(Config::default().sanitize().is_empty());
    }
}
