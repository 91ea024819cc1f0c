//! # Error Types
//!
//! Custom error types for the ground station using `thiserror`.

use std::collections::TryReserveError;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Main error type for the ground station
#[derive(Debug, Error)]
pub enum GroundStationError {
    /// Connect attempt failed
    #[error("Failed to open serial port {port}: {reason}")]
    PortOpen { port: String, reason: String },

    /// Telemetry line carried fewer fields than a sample needs
    #[error("Malformed telemetry line: expected {expected} fields, got {found}")]
    MalformedLine {
        expected: usize,
        found: usize,
        line: String,
    },

    /// A telemetry field failed numeric conversion
    #[error("Failed to parse {field} (field {index}) from {value:?}")]
    NumericParse {
        field: &'static str,
        index: usize,
        value: String,
    },

    /// Write attempted without an open link
    #[error("Serial not connected")]
    NotConnected,

    /// Liveness check found the link closed
    #[error("Serial channel {0} closed")]
    ChannelClosed(String),

    /// Received bytes were not valid UTF-8
    #[error("Failed to decode telemetry line: {0}")]
    Decode(#[from] FromUtf8Error),

    /// Sample timestamp went backwards relative to the recorded series
    #[error("Sample time {time} precedes last recorded time {last}; reset to start a new series")]
    NonMonotonicTime { time: f64, last: f64 },

    /// Sample timestamp was NaN or infinite
    #[error("Sample time {0} is not a finite number")]
    NonFiniteTime(f64),

    /// Could not reserve room for another sample
    #[error("Telemetry store allocation failed: {0}")]
    StoreCapacity(#[from] TryReserveError),

    /// Serial read/write errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the ground station
pub type Result<T> = std::result::Result<T, GroundStationError>;
