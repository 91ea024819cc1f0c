//! # Telemetry Line Parser
//!
//! Decodes one CSV telemetry line into a [`TelemetrySample`].
//!
//! Wire order: `time, altitude, temperature, pressure, accel_x, accel_y,
//! accel_z, gyro_x, gyro_y, gyro_z, gps_lat, gps_long, gps_alt, velocity,
//! gps_fix`. Fields past the fifteenth are ignored.

use std::str::FromStr;

use super::sample::{TelemetrySample, Vector3, FIELD_NAMES, TELEMETRY_FIELD_COUNT};
use crate::error::{GroundStationError, Result};

/// Parse a telemetry line
///
/// Pure: the caller decides whether to store the sample.
///
/// # Errors
///
/// Returns error if:
/// - The line has fewer than 15 fields (`MalformedLine`)
/// - Any field fails numeric conversion (`NumericParse`), including
///   `nan` and `inf` in a float field
///
/// # Examples
///
/// ```
/// use ground_station::telemetry::parse_line;
///
/// let sample = parse_line("1000,120.5,22.3,101325,0.1,0.2,9.8,0.01,0.02,0.03,37.7,-122.4,10.0,5.5,1")?;
/// assert_eq!(sample.altitude, 120.5);
/// assert_eq!(sample.gps_fix, 1);
/// # Ok::<(), ground_station::error::GroundStationError>(())
/// ```
pub fn parse_line(line: &str) -> Result<TelemetrySample> {
    let line = line.trim();
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    if fields.len() < TELEMETRY_FIELD_COUNT {
        return Err(GroundStationError::MalformedLine {
            expected: TELEMETRY_FIELD_COUNT,
            found: fields.len(),
            line: line.to_string(),
        });
    }

    let float = |index: usize| parse_float(&fields, index);

    Ok(TelemetrySample {
        time: float(0)?,
        altitude: float(1)?,
        temperature: float(2)?,
        pressure: float(3)?,
        accel: Vector3::new(float(4)?, float(5)?, float(6)?),
        gyro: Vector3::new(float(7)?, float(8)?, float(9)?),
        gps_lat: float(10)?,
        gps_long: float(11)?,
        gps_alt: float(12)?,
        velocity: float(13)?,
        gps_fix: parse_field::<u32>(&fields, 14)?,
    })
}

fn parse_field<T: FromStr>(fields: &[&str], index: usize) -> Result<T> {
    let value = fields[index];
    value.parse::<T>().map_err(|_| numeric_error(fields, index))
}

/// Decimal float field; `f64::from_str` also takes `nan`/`inf`, which are rejected
fn parse_float(fields: &[&str], index: usize) -> Result<f64> {
    let value = parse_field::<f64>(fields, index)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(numeric_error(fields, index))
    }
}

fn numeric_error(fields: &[&str], index: usize) -> GroundStationError {
    GroundStationError::NumericParse {
        field: FIELD_NAMES[index],
        index,
        value: fields[index].to_string(),
    }
}
