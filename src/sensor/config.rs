//! Sensor configuration.

use crate::error::{Result, SensorError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Display unit for emitted readings.
///
/// The raw hardware value is always Celsius; the unit is applied before
/// calibration so the polynomial coefficients operate in the display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Display symbol for this unit.
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

impl std::str::FromStr for TemperatureUnit {
    type Err = SensorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "C" | "c" => Ok(TemperatureUnit::Celsius),
            "F" | "f" => Ok(TemperatureUnit::Fahrenheit),
            other => Err(SensorError::config(format!(
                "unknown temperature unit '{}', expected C or F",
                other
            ))),
        }
    }
}

/// Configuration for one polling instance.
///
/// Captured once when a run starts; later changes to the source of these
/// values never affect a run in progress. Validated by [`SensorConfig::validate`]
/// before the loop is allowed to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// 1-Wire bus address of the sensor (e.g. "28-000005e2fdc3")
    pub address: String,
    /// Calibration bias, added after the polynomial terms
    pub bias: f64,
    /// Linear calibration coefficient
    pub linear_coef: f64,
    /// Quadratic calibration coefficient
    pub quadratic_coef: f64,
    /// Exponential moving average weight, in (0, 1]; 1 disables smoothing
    pub alpha: f64,
    /// ADC precision in bits (9-12)
    pub precision: u8,
    /// Target time between polls; must be at least one second
    pub update_interval: Duration,
    /// Readings at or below this threshold are discarded
    pub low_filter: f64,
    /// Readings at or above this threshold are discarded
    pub high_filter: f64,
    /// Display duration for filtered-value notifications; zero disables them
    pub filtered_timeout: Duration,
    /// Display duration for update-overrun notifications; zero disables them
    pub overrun_timeout: Duration,
    /// Display unit, resolved once at the start of a run
    pub unit: TemperatureUnit,
}

impl SensorConfig {
    /// Create a configuration with the defaults for the given address.
    ///
    /// Defaults: identity calibration, no smoothing (alpha 1.0), 12 bit
    /// precision, 5 second interval, 0-100 °C filters, 5 second notification
    /// timeouts, Celsius.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            bias: 0.0,
            linear_coef: 1.0,
            quadratic_coef: 0.0,
            alpha: 1.0,
            precision: 12,
            update_interval: Duration::from_millis(crate::DEFAULT_UPDATE_INTERVAL_MS),
            low_filter: 0.0,
            high_filter: 100.0,
            filtered_timeout: Duration::from_millis(crate::DEFAULT_NOTIFY_TIMEOUT_MS),
            overrun_timeout: Duration::from_millis(crate::DEFAULT_NOTIFY_TIMEOUT_MS),
            unit: TemperatureUnit::Celsius,
        }
    }

    /// Set the calibration polynomial (quadratic, linear, bias).
    pub fn with_calibration(mut self, quadratic: f64, linear: f64, bias: f64) -> Self {
        self.quadratic_coef = quadratic;
        self.linear_coef = linear;
        self.bias = bias;
        self
    }

    /// Set the smoothing weight.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the ADC precision in bits.
    pub fn with_precision(mut self, bits: u8) -> Self {
        self.precision = bits;
        self
    }

    /// Set the polling interval.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Set the plausibility filter bounds.
    pub fn with_filters(mut self, low: f64, high: f64) -> Self {
        self.low_filter = low;
        self.high_filter = high;
        self
    }

    /// Set the notification timeouts (zero disables a channel).
    pub fn with_notify_timeouts(mut self, filtered: Duration, overrun: Duration) -> Self {
        self.filtered_timeout = filtered;
        self.overrun_timeout = overrun;
        self
    }

    /// Set the display unit and move the default filters to match.
    ///
    /// Only adjusts filters that are still at the Celsius defaults, so an
    /// explicit `with_filters` survives a later unit switch.
    pub fn with_unit(mut self, unit: TemperatureUnit) -> Self {
        if unit == TemperatureUnit::Fahrenheit
            && self.low_filter == 0.0
            && self.high_filter == 100.0
        {
            self.low_filter = 32.0;
            self.high_filter = 212.0;
        }
        self.unit = unit;
        self
    }

    /// Validate the configuration before a run starts.
    ///
    /// Violations here are fatal: the loop must never start with an invalid
    /// smoothing weight, a sub-second interval, or inverted filter bounds.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(SensorError::config("α must be >0 and <=1"));
        }
        if self.update_interval < Duration::from_secs(1) {
            return Err(SensorError::config("update interval must be >= 1000ms"));
        }
        if self.low_filter >= self.high_filter {
            return Err(SensorError::config("low filter must be < high filter"));
        }
        Ok(())
    }
}
