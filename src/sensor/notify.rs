//! User-facing notifications and the rolling warning counter.
//!
//! The crate decides *when* to notify and *what* the message is; delivery is
//! behind the [`NotificationSink`] trait so a host UI, a message bus, or the
//! default tracing logger can all serve as transport.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How many notable events may accumulate before a single escalation
/// notification fires and the counter resets.
pub const ESCALATION_THRESHOLD: u32 = 50;

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

/// Destination for user-visible notifications.
///
/// `timeout` is how long the host should display the message; `None` means
/// display until dismissed.
pub trait NotificationSink {
    fn notify(&self, severity: Severity, message: &str, timeout: Option<Duration>);
}

impl<F> NotificationSink for F
where
    F: Fn(Severity, &str, Option<Duration>),
{
    fn notify(&self, severity: Severity, message: &str, timeout: Option<Duration>) {
        self(severity, message, timeout)
    }
}

/// Notification sink that logs through tracing instead of displaying.
///
/// Useful for headless operation and as the CLI default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str, _timeout: Option<Duration>) {
        match severity {
            Severity::Info => tracing::info!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Danger => tracing::error!("{}", message),
        }
    }
}

/// One class of rate-limited notification, gated by its configured timeout.
///
/// A timeout of zero is the universal "disable this class" sentinel; the
/// filtered-value and update-overrun classes each get their own channel.
#[derive(Debug, Clone, Copy)]
pub struct NotifyChannel {
    timeout: Duration,
}

impl NotifyChannel {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Whether this class of notification is enabled at all.
    pub fn enabled(&self) -> bool {
        !self.timeout.is_zero()
    }

    /// Send a warning through `sink` if this channel is enabled.
    pub fn send(&self, sink: &impl NotificationSink, message: &str) {
        if self.enabled() {
            sink.notify(Severity::Warning, message, Some(self.timeout));
        }
    }
}

/// Rolling tally of notable anomalies.
///
/// Acts as a coarse circuit breaker against notification flooding: once the
/// count passes [`ESCALATION_THRESHOLD`], [`WarningCounter::record`] reports
/// that an escalation is due and starts a fresh count.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarningCounter {
    count: u32,
}

impl WarningCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tally since the last escalation.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Record one notable event; returns true exactly when the escalation
    /// threshold has been exceeded, resetting the counter.
    pub fn record(&mut self) -> bool {
        self.count += 1;
        if self.count > ESCALATION_THRESHOLD {
            self.count = 0;
            true
        } else {
            false
        }
    }
}
