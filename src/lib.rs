//! # w1therm - Calibrated DS18B20 1-Wire Temperature Polling
//!
//! A Rust crate for polling DS18B20-class 1-Wire temperature probes on a
//! Raspberry Pi through the kernel's sysfs interface, with per-sensor
//! calibration, plausibility filtering, exponential smoothing, and
//! rate-limited diagnostics.
//!
//! ## Features
//!
//! - **Fixed-cadence polling**: wake-up deadlines that absorb variable
//!   conversion latency, with explicit overrun reporting
//! - **Polynomial calibration**: per-sensor quadratic/linear/bias terms in
//!   Celsius or Fahrenheit
//! - **Filtering & smoothing**: strict plausibility bounds and an
//!   exponential moving average that outliers cannot corrupt
//! - **Bounded diagnostics**: per-class notification timeouts plus a
//!   rolling warning counter that escalates instead of flooding
//! - **Injected seams**: probe, reading sink, and notification transport
//!   are traits, so hosts and tests supply their own
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use w1therm::{RunFlag, SensorConfig, SensorPoller, TemperatureReading, TracingNotifier, W1Bus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = W1Bus::new();
//!     let address = bus.discover_sensors().into_iter().next().expect("no sensor");
//!
//!     let config = SensorConfig::new(&address);
//!     let probe = bus.probe(&address);
//!     let flag = RunFlag::new();
//!
//!     let mut poller = SensorPoller::new(
//!         config,
//!         probe,
//!         |reading: TemperatureReading| println!("{}", reading),
//!         TracingNotifier,
//!     );
//!     poller.run(&flag).await?;
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod error;
pub mod sensor;

// Re-export public API
pub use device::{load_driver_modules, W1Bus, W1Probe};
pub use error::{Result, SensorError};
pub use sensor::{
    calibrate::{calibrate, is_error_code, SENSOR_ERROR_CELSIUS},
    config::{SensorConfig, TemperatureUnit},
    data::TemperatureReading,
    filter::{EmaFilter, FilterOutcome},
    notify::{NotificationSink, NotifyChannel, Severity, TracingNotifier, WarningCounter},
    poller::{SensorPoller, SETTLE_DELAY},
    traits::{ReadingSink, RunFlag, TemperatureProbe},
};

/// The default polling interval in milliseconds
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 5000;

/// The default notification display duration in milliseconds
pub const DEFAULT_NOTIFY_TIMEOUT_MS: u64 = 5000;
