use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Validation errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] InvalidConfiguration),

    // Configuration file errors
    #[error("Config file not found at {path}. A template has been created - edit it and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // Rotator errors
    #[error("Rotator is no longer running")]
    RotatorClosed,
}

/// Reasons a configuration call was rejected.
///
/// A rejected call never mutates the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidConfiguration {
    #[error("there must be at least one text")]
    EmptyTexts,

    #[error("no texts have been provided")]
    TextsUnset,

    #[error("timeout must be longer than 0")]
    NonPositiveTimeout,

    #[error("timeout is too large to represent")]
    TimeoutOutOfRange,

    #[error("index {index} is out of range for {len} texts")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no string array named {id:?}")]
    UnknownTextArray { id: String },
}

impl InvalidConfiguration {
    /// Whether the rejection came from a timeout setter.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::NonPositiveTimeout | Self::TimeoutOutOfRange)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

