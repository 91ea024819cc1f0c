//! # Telemetry Module
//!
//! Turns raw serial lines into samples and keeps the per-channel series.
//!
//! This module handles:
//! - Decoding the 15-field CSV telemetry record
//! - Normalizing device timestamps to start at zero
//! - Storing channels in lock-step for plotting
//! - Projecting the latest sample onto the info panel

pub mod info;
pub mod parser;
pub mod sample;
pub mod store;

pub use info::format_info_panel;
pub use parser::parse_line;
pub use sample::{TelemetrySample, Vector3};
pub use store::{Channel, Snapshot, TelemetryStore};
