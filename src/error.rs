//! Error types for construction-time failures.
//!
//! Per-block analysis and per-frame rendering never fail; they degrade to a
//! calmer output instead. Only configuration, parsing and device setup
//! surface errors.

use thiserror::Error;

/// Errors raised while configuring or starting the visualizer
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value violates its documented contract
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Palette name did not match any known palette
    #[error("Unknown palette: {0}")]
    UnknownPalette(String),

    /// Strategy name did not match any known rendering strategy
    #[error("Unknown rendering strategy: {0}")]
    UnknownStrategy(String),

    /// No usable audio input device was found
    #[error("No audio input device found")]
    NoInputDevice,

    /// Capture device query or configuration failed
    #[error("Audio device error: {0}")]
    Device(String),

    /// Capture stream could not be built or started
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// Worker thread or terminal I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for plasmaterm operations
pub type Result<T> = std::result::Result<T, Error>;
