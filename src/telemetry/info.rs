//! Info panel text for the most recent sample.

use super::sample::TelemetrySample;

/// Format the GPS and acceleration block shown beside the charts
pub fn format_info_panel(sample: &TelemetrySample) -> String {
    format!(
        "GPS Lat: {}\n\
         GPS Long: {}\n\
         GPS Alt: {}m\n\
         GPS Fix: {}\n\
         Accel X: {} m/s²\n\
         Accel Y: {} m/s²\n\
         Accel Z: {} m/s²",
        sample.gps_lat,
        sample.gps_long,
        sample.gps_alt,
        sample.gps_fix,
        sample.accel.x,
        sample.accel.y,
        sample.accel.z,
    )
}
