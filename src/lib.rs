//! # Ground Station Library
//!
//! Serial telemetry ground station for rocket flight computers.
//!
//! This library reads line-delimited CSV telemetry from a serial link,
//! keeps per-channel time series for plotting, and sends operator commands
//! (`LAUNCH`, `ABORT`, free text) back over the same link.

pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod presentation;
pub mod serial;
pub mod session;
pub mod telemetry;
