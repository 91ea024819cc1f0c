//! # Telemetry Sample Types
//!
//! Field layout of a single telemetry record as sent by the flight computer.

use serde::Serialize;

/// Number of comma-separated fields in one telemetry line
pub const TELEMETRY_FIELD_COUNT: usize = 15;

/// Field names in wire order
pub const FIELD_NAMES: [&str; TELEMETRY_FIELD_COUNT] = [
    "time",
    "altitude",
    "temperature",
    "pressure",
    "accel_x",
    "accel_y",
    "accel_z",
    "gyro_x",
    "gyro_y",
    "gyro_z",
    "gps_lat",
    "gps_long",
    "gps_alt",
    "velocity",
    "gps_fix",
];

/// Three-axis reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One decoded telemetry record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetrySample {
    /// Raw device timestamp (device clock units)
    pub time: f64,

    /// Barometric altitude in meters
    pub altitude: f64,

    /// Temperature in °C
    pub temperature: f64,

    /// Pressure in pascals
    pub pressure: f64,

    /// Acceleration in m/s²
    pub accel: Vector3,

    /// Angular rate
    pub gyro: Vector3,

    /// GPS latitude in degrees
    pub gps_lat: f64,

    /// GPS longitude in degrees
    pub gps_long: f64,

    /// GPS altitude in meters
    pub gps_alt: f64,

    /// Velocity in m/s
    pub velocity: f64,

    /// GPS fix quality code, passed through unvalidated
    pub gps_fix: u32,
}
