//! Injected seams of the polling loop.
//!
//! The poller is written against these narrow traits so hardware access,
//! reading delivery, and cancellation are all owned by the host, not
//! inherited from a base lifecycle.

use crate::device::W1Probe;
use crate::error::Result;
use crate::sensor::data::TemperatureReading;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Access to one physical temperature probe.
///
/// Methods are async so test probes can model conversion latency with timer
/// sleeps; the real sysfs probe completes immediately.
pub trait TemperatureProbe {
    /// Bus address of the probe, used in log and notification messages.
    fn address(&self) -> &str;

    /// Read the latest Celsius conversion; `Ok(None)` means not ready yet.
    fn read_temperature(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Option<f64>>> + Send;

    /// Write the ADC precision setting to the probe.
    fn set_precision(&mut self, bits: u8) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl TemperatureProbe for W1Probe {
    fn address(&self) -> &str {
        W1Probe::address(self)
    }

    async fn read_temperature(&mut self) -> Result<Option<f64>> {
        // sysfs status files are tiny; a blocking read is fine here.
        W1Probe::read_temperature(self)
    }

    async fn set_precision(&mut self, bits: u8) -> Result<()> {
        W1Probe::set_precision(self, bits)
    }
}

/// Destination for accepted readings, invoked once per emitted data point.
pub trait ReadingSink {
    fn record(&mut self, reading: TemperatureReading);
}

impl<F> ReadingSink for F
where
    F: FnMut(TemperatureReading),
{
    fn record(&mut self, reading: TemperatureReading) {
        self(reading)
    }
}

/// Readings can be fanned out through a channel and consumed as a stream.
impl ReadingSink for tokio::sync::mpsc::UnboundedSender<TemperatureReading> {
    fn record(&mut self, reading: TemperatureReading) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.send(reading);
    }
}

/// Cooperative cancellation flag, polled once per loop iteration.
///
/// Cloning shares the flag, so the host keeps one handle and hands another
/// to the poller. An in-flight iteration always completes before a stop
/// request is honored.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl RunFlag {
    /// Create a flag in the running state.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Request a stop; honored at the top of the next iteration.
    pub fn stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
