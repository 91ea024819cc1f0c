//! # Serial Communication Module
//!
//! Handles the serial link to the flight computer.
//!
//! This module handles:
//! - Opening the telemetry port at 115,200 baud
//! - Framing received bytes into lines
//! - Writing newline-terminated commands
//! - Liveness checks and reconnection

pub mod connection;
pub mod framing;
pub mod link;

pub use connection::{Connection, LinkState, LivenessOutcome};
pub use link::{LinkOpener, SerialLink, TokioSerialLink, TokioSerialOpener};

use crate::error::{GroundStationError, Result};

/// Telemetry link baud rate
pub const TELEMETRY_BAUD_RATE: u32 = 115_200;

/// List serial device names present on this machine
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| GroundStationError::Serial(format!("Failed to enumerate ports: {}", e)))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
