//! Data structures for emitted sensor readings.

use crate::sensor::config::TemperatureUnit;
use serde::{Deserialize, Serialize};

/// A validated, calibrated, smoothed temperature reading.
///
/// Produced only for raw values that passed error-code detection and the
/// plausibility filter; the value is rounded to one decimal place at
/// emission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// Bus address of the sensor that produced this reading
    pub address: String,
    /// Smoothed temperature, rounded to one decimal place
    pub value: f64,
    /// Display unit of the value
    pub unit: TemperatureUnit,
    /// Timestamp when this reading was emitted (Unix timestamp in milliseconds)
    pub timestamp: u64,
}

impl TemperatureReading {
    /// Create a reading stamped with the current time.
    pub fn new(address: impl Into<String>, value: f64, unit: TemperatureUnit) -> Self {
        Self {
            address: address.into(),
            value,
            unit,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        }
    }
}

impl std::fmt::Display for TemperatureReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:.1}{}", self.address, self.value, self.unit.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_serializes_with_unit_letter() {
        let reading = TemperatureReading::new("28-000005e2fdc3", 23.5, TemperatureUnit::Celsius);
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"unit\":\"C\""));
        assert!(json.contains("23.5"));

        let back: TemperatureReading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn display_uses_one_decimal_and_symbol() {
        let reading = TemperatureReading {
            address: "28-0".into(),
            value: 71.6,
            unit: TemperatureUnit::Fahrenheit,
            timestamp: 0,
        };
        assert_eq!(reading.to_string(), "28-0: 71.6°F");
    }
}
