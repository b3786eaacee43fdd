//! Polynomial calibration of raw probe readings.

use crate::sensor::config::TemperatureUnit;

/// Raw Celsius value the DS18B20 reports on a communication fault.
///
/// This is the power-on default of the conversion register, so a reading of
/// exactly 85 °C means the conversion never ran, not that the probe measured
/// 85 degrees.
pub const SENSOR_ERROR_CELSIUS: f64 = 85.0;

/// Whether a raw Celsius reading is the hardware communication-error code.
///
/// Checked on the Celsius value before any unit conversion, regardless of
/// the configured display unit.
pub fn is_error_code(raw_celsius: f64) -> bool {
    raw_celsius == SENSOR_ERROR_CELSIUS
}

/// Apply unit conversion and the calibration polynomial to a raw reading.
///
/// For Celsius the polynomial operates directly on the raw value; for
/// Fahrenheit the raw value is converted first so the coefficients are in
/// the display unit:
///
/// `calibrated = quadratic*x² + linear*x + bias`
///
/// Callers must screen out the error code with [`is_error_code`] first; this
/// function calibrates whatever it is given.
pub fn calibrate(
    raw_celsius: f64,
    unit: TemperatureUnit,
    bias: f64,
    linear: f64,
    quadratic: f64,
) -> f64 {
    let x = match unit {
        TemperatureUnit::Celsius => raw_celsius,
        TemperatureUnit::Fahrenheit => raw_celsius * 9.0 / 5.0 + 32.0,
    };
    quadratic * x * x + linear * x + bias
}
