//! Terminal audio visualization core.
//!
//! Samples flow from a [`SampleBuffer`] through the [`SpectralAnalyzer`] and
//! [`SpectrumSmoother`] into one of the visualization modes, which paints a
//! [`FrameGrid`]; the [`DiffRenderer`] pushes only the changed cells to a
//! [`Surface`]. [`Engine`] runs the first three stages once per tick.
//!
//! Nothing here touches a terminal or an audio device.

pub mod analyzer;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod modes;
pub mod platform;
pub mod renderer;
pub mod sample_buffer;
pub mod smoothing;

pub use analyzer::{
    AnalyzerConfig, BandLayout, BandSpectrum, EqStrength, Normalization, SpectralAnalyzer, WaveformSnapshot,
};
pub use color::{ColorScheme, ColorTier};
pub use config::{Config, SourceKind};
pub use engine::{ControlSnapshot, Engine};
pub use error::{ConfigError, ParseNameError, SurfaceError};
pub use grid::{FrameGrid, Glyphs, RenderCell};
pub use modes::{ModeKind, ModeOptions, VisualMode};
pub use renderer::{DiffRenderer, FrameStats, Surface};
pub use sample_buffer::{SampleBuffer, SampleWindow};
pub use smoothing::{SmoothingConfig, SpectrumSmoother};
