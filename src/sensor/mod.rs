//! Sensor pipeline: configuration, calibration, filtering, notification,
//! and the polling loop that ties them together.
//!
//! Data flows probe → error-code screening → calibration → filter/smoother
//! → emitted reading, with diagnostics branching off to the rate-limited
//! notifier at every failure point.

pub mod calibrate;
pub mod config;
pub mod data;
pub mod filter;
pub mod notify;
pub mod poller;
pub mod traits;

// Re-export commonly used items
pub use config::{SensorConfig, TemperatureUnit};
pub use data::TemperatureReading;
pub use filter::{EmaFilter, FilterOutcome};
pub use notify::{NotificationSink, Severity, TracingNotifier, WarningCounter};
pub use poller::SensorPoller;
pub use traits::{ReadingSink, RunFlag, TemperatureProbe};
