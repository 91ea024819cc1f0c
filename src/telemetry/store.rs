//! # Telemetry Store
//!
//! Append-only, lock-step series of normalized time and per-channel values.
//!
//! Index `i` of every series belongs to the same sample. Appends reserve
//! room in every series before pushing anything, so a failed append leaves
//! all series at their previous length.

use serde::Serialize;

use super::sample::TelemetrySample;
use crate::error::{GroundStationError, Result};

/// Number of plotted channels
pub const CHANNEL_COUNT: usize = 10;

/// Plotted telemetry quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Temperature,
    Altitude,
    Pressure,
    AccelX,
    AccelY,
    AccelZ,
    GyroX,
    GyroY,
    GyroZ,
    Velocity,
}

impl Channel {
    /// All channels, in storage order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Temperature,
        Channel::Altitude,
        Channel::Pressure,
        Channel::AccelX,
        Channel::AccelY,
        Channel::AccelZ,
        Channel::GyroX,
        Channel::GyroY,
        Channel::GyroZ,
        Channel::Velocity,
    ];

    /// Chart title with units
    pub fn label(self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature (°C)",
            Channel::Altitude => "Altitude (m)",
            Channel::Pressure => "Pressure (Pa)",
            Channel::AccelX => "Accel X (m/s²)",
            Channel::AccelY => "Accel Y (m/s²)",
            Channel::AccelZ => "Accel Z (m/s²)",
            Channel::GyroX => "Gyro X",
            Channel::GyroY => "Gyro Y",
            Channel::GyroZ => "Gyro Z",
            Channel::Velocity => "Velocity (m/s)",
        }
    }

    /// Extract this channel's value from a sample
    pub fn value(self, sample: &TelemetrySample) -> f64 {
        match self {
            Channel::Temperature => sample.temperature,
            Channel::Altitude => sample.altitude,
            Channel::Pressure => sample.pressure,
            Channel::AccelX => sample.accel.x,
            Channel::AccelY => sample.accel.y,
            Channel::AccelZ => sample.accel.z,
            Channel::GyroX => sample.gyro.x,
            Channel::GyroY => sample.gyro.y,
            Channel::GyroZ => sample.gyro.z,
            Channel::Velocity => sample.velocity,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Read-only view of one channel against the shared time axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot<'a> {
    pub time: &'a [f64],
    pub values: &'a [f64],
}

impl Snapshot<'_> {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// `(time, value)` pairs, oldest first
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.values.iter().copied())
    }
}

/// Session telemetry series
#[derive(Debug, Default)]
pub struct TelemetryStore {
    /// Raw timestamp of the first sample since the last reset
    time_offset: Option<f64>,
    time: Vec<f64>,
    channels: [Vec<f64>; CHANNEL_COUNT],
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample, returning its normalized time
    ///
    /// The first sample since construction or [`reset`](Self::reset) fixes
    /// the time offset, so its normalized time is `0`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The sample's time is NaN or infinite
    /// - The sample's time is earlier than the last recorded time
    /// - Memory for the new point cannot be reserved
    ///
    /// Nothing is appended and the offset is left untouched on error.
    pub fn record(&mut self, sample: &TelemetrySample) -> Result<f64> {
        if !sample.time.is_finite() {
            return Err(GroundStationError::NonFiniteTime(sample.time));
        }
        let offset = self.time_offset.unwrap_or(sample.time);
        let adjusted = sample.time - offset;

        if let Some(&last) = self.time.last() {
            if adjusted < last {
                return Err(GroundStationError::NonMonotonicTime {
                    time: adjusted,
                    last,
                });
            }
        }

        self.time.try_reserve(1)?;
        for series in self.channels.iter_mut() {
            series.try_reserve(1)?;
        }

        self.time_offset = Some(offset);
        self.time.push(adjusted);
        for channel in Channel::ALL {
            self.channels[channel.index()].push(channel.value(sample));
        }

        Ok(adjusted)
    }

    /// Clear every series and forget the time offset
    pub fn reset(&mut self) {
        self.time_offset = None;
        self.time.clear();
        for series in self.channels.iter_mut() {
            series.clear();
        }
    }

    /// Current series for one channel
    pub fn snapshot(&self, channel: Channel) -> Snapshot<'_> {
        Snapshot {
            time: &self.time,
            values: &self.channels[channel.index()],
        }
    }

    pub fn time_offset(&self) -> Option<f64> {
        self.time_offset
    }

    /// Normalized time axis
    pub fn times(&self) -> &[f64] {
        &self.time
    }

    /// Number of recorded samples
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}
