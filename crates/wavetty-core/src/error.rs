//! Error types shared by the core crate.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading or writing the TOML config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A display surface refused an operation.
///
/// Cell-level errors are absorbed by the renderer; only flush failures reach
/// the render loop.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} surface")]
    OutOfBounds { row: u16, col: u16, rows: u16, cols: u16 },
}

/// An enum value given by name (CLI flag or config) did not match any variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseNameError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

impl ParseNameError {
    pub fn new(kind: &'static str, value: &str, expected: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: expected.join(", "),
        }
    }
}
