//! Error types for audio device and stream handling

use std::fmt;

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio engine errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device enumeration failed: {0}")]
    Enumeration(String),

    #[error("Failed to open stream: {0}")]
    StreamOpen(String),

    #[error("Stream control failed: {0}")]
    StreamControl(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{kind}: {message}")]
    Engine { kind: ErrorKind, message: String },
}

/// Severity classification attached to asynchronous engine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Non-critical problem reported by the engine
    Warning,
    /// The device disappeared while the stream was open
    DeviceDisconnected,
    /// Invalid device or stream parameter
    InvalidParameter,
    /// Function called in the wrong state
    InvalidUse,
    /// Host driver failure
    DriverError,
    /// Operating system or backend failure
    SystemError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Warning => "warning",
            Self::DeviceDisconnected => "device disconnected",
            Self::InvalidParameter => "invalid parameter",
            Self::InvalidUse => "invalid use",
            Self::DriverError => "driver error",
            Self::SystemError => "system error",
        };
        f.write_str(label)
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
