//! Unit conversion
//!
//! The conversion table is closed. A pair missing from it is a configuration
//! error, never an approximation.

use rating_common::{ConfigurationError, MetricUnit, RatingUnit};

/// Bytes per GiB
pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Seconds per hour
pub const SECONDS_PER_HOUR: f64 = 3600.0;

type Conversion = fn(f64) -> f64;

fn byte_seconds_to_gib_hours(qty: f64) -> f64 {
    qty / BYTES_PER_GIB / SECONDS_PER_HOUR
}

fn core_seconds_to_core_hours(qty: f64) -> f64 {
    qty / SECONDS_PER_HOUR
}

fn bytes_to_gib(qty: f64) -> f64 {
    qty / BYTES_PER_GIB
}

fn lookup(from: MetricUnit, to: RatingUnit) -> Option<Conversion> {
    match (from, to) {
        (MetricUnit::ByteSeconds, RatingUnit::GibHours) => Some(byte_seconds_to_gib_hours),
        (MetricUnit::CoreSeconds, RatingUnit::CoreHours) => Some(core_seconds_to_core_hours),
        (MetricUnit::Byte, RatingUnit::Gib) => Some(bytes_to_gib),
        _ => None,
    }
}

/// Convert a quantity from a metric unit into a rating unit
pub fn convert(from: MetricUnit, to: RatingUnit, qty: f64) -> Result<f64, ConfigurationError> {
    lookup(from, to)
        .map(|conversion| conversion(qty))
        .ok_or_else(|| ConfigurationError::UnsupportedConversion {
            from: from.to_string(),
            to: to.to_string(),
        })
}

/// Convert into a rating unit named by a rule
pub fn convert_to(from: MetricUnit, to: &str, qty: f64) -> Result<f64, ConfigurationError> {
    let target = to
        .parse::<RatingUnit>()
        .map_err(|to| ConfigurationError::UnsupportedConversion {
            from: from.to_string(),
            to,
        })?;
    convert(from, target, qty)
}
