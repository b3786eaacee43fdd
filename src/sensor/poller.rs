//! The fixed-cadence polling loop.
//!
//! One [`SensorPoller`] owns one probe and drives the whole pipeline: read,
//! error-code screening, calibration, filtering, smoothing, emission, and
//! the rate-limited diagnostics around all of it. Run state (the smoothing
//! memory and the warning tally) lives inside [`SensorPoller::run`] and is
//! created fresh for every run, so a stopped instance restarts clean.

use crate::error::Result;
use crate::sensor::calibrate::{calibrate, is_error_code};
use crate::sensor::config::SensorConfig;
use crate::sensor::data::TemperatureReading;
use crate::sensor::filter::{EmaFilter, FilterOutcome};
use crate::sensor::notify::{
    NotificationSink, NotifyChannel, Severity, WarningCounter, ESCALATION_THRESHOLD,
};
use crate::sensor::traits::{ReadingSink, RunFlag, TemperatureProbe};
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};

/// Delay between a precision change and the first read, letting a
/// just-written setting settle before the conversion that follows it.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Fixed-cadence poller for a single temperature probe.
///
/// Generic over its three injected seams: the hardware probe, the sink that
/// receives accepted readings, and the notification transport.
pub struct SensorPoller<P, S, N> {
    config: SensorConfig,
    probe: P,
    sink: S,
    notifier: N,
}

impl<P, S, N> SensorPoller<P, S, N>
where
    P: TemperatureProbe,
    S: ReadingSink,
    N: NotificationSink,
{
    pub fn new(config: SensorConfig, probe: P, sink: S, notifier: N) -> Self {
        Self {
            config,
            probe,
            sink,
            notifier,
        }
    }

    /// Run the polling loop until `flag` is cleared.
    ///
    /// Configuration is validated up front; a violation is surfaced with
    /// danger severity and returned, and the loop never starts. Everything
    /// after that point recovers locally: a single bad reading can skip an
    /// iteration but never terminates the run.
    pub async fn run(&mut self, flag: &RunFlag) -> Result<()> {
        if let Err(err) = self.config.validate() {
            self.notifier
                .notify(Severity::Danger, &err.to_string(), None);
            return Err(err);
        }

        let address = self.probe.address().to_string();

        // Precision lives in the sensor's volatile SRAM and usually needs
        // root to change; keep going with whatever is already set.
        if let Err(err) = self.probe.set_precision(self.config.precision).await {
            let msg = format!(
                "Could not change precision of {}, may have insufficient permissions",
                address
            );
            tracing::warn!("{}: {}", msg, err);
            self.notifier.notify(Severity::Warning, &msg, None);
        }

        sleep(SETTLE_DELAY).await;

        let mut filter = EmaFilter::new(
            self.config.low_filter,
            self.config.high_filter,
            self.config.alpha,
        );
        let mut warnings = WarningCounter::new();
        let filtered_channel = NotifyChannel::new(self.config.filtered_timeout);
        let overrun_channel = NotifyChannel::new(self.config.overrun_timeout);

        while flag.is_running() {
            let wake_deadline = Instant::now() + self.config.update_interval;

            match self.probe.read_temperature().await {
                // Conversion still in progress; the cadence is the retry.
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!("read of {} failed, skipping iteration: {}", address, err);
                }
                Ok(Some(raw)) => {
                    if is_error_code(raw) {
                        Self::count_warning(&self.notifier, &mut warnings, &address);
                        let msg = format!("Communication error with {} detected", address);
                        tracing::info!("{}", msg);
                        self.notifier.notify(Severity::Warning, &msg, None);
                    } else {
                        let calibrated = calibrate(
                            raw,
                            self.config.unit,
                            self.config.bias,
                            self.config.linear_coef,
                            self.config.quadratic_coef,
                        );
                        match filter.process(calibrated) {
                            FilterOutcome::Accepted(value) => {
                                self.sink.record(TemperatureReading::new(
                                    &address,
                                    value,
                                    self.config.unit,
                                ));
                            }
                            FilterOutcome::Rejected(value) => {
                                Self::count_warning(&self.notifier, &mut warnings, &address);
                                let msg =
                                    format!("{} reading of {:.1} filtered", address, value);
                                tracing::info!("{}", msg);
                                filtered_channel.send(&self.notifier, &msg);
                            }
                        }
                    }
                }
            }

            let now = Instant::now();
            if now >= wake_deadline {
                // Budget overrun: no sleep and no catch-up compensation, the
                // next read starts immediately.
                Self::count_warning(&self.notifier, &mut warnings, &address);
                let msg = format!(
                    "Reading of {} could not complete within update interval",
                    address
                );
                tracing::info!("{}", msg);
                overrun_channel.send(&self.notifier, &msg);
            } else {
                sleep_until(wake_deadline).await;
            }
        }

        tracing::info!("polling of {} stopped", address);
        Ok(())
    }

    /// Tally one notable event, escalating when the rolling count passes the
    /// threshold. The escalation notice ignores the per-class enable flags.
    fn count_warning(notifier: &N, warnings: &mut WarningCounter, address: &str) {
        if warnings.record() {
            let msg = format!(
                "More than {} warnings logged for sensor {}, recheck the hardware and/or adjust the sensor settings",
                ESCALATION_THRESHOLD, address
            );
            notifier.notify(Severity::Warning, &msg, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SensorError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Probe that replays a scripted sequence of readings, repeating the
    /// last entry once exhausted, with an optional simulated read latency.
    struct ScriptedProbe {
        script: Vec<Option<f64>>,
        next: usize,
        read_delay: Duration,
        fail_precision: bool,
        reads: Arc<AtomicUsize>,
    }

    impl ScriptedProbe {
        fn new(script: Vec<Option<f64>>) -> Self {
            Self {
                script,
                next: 0,
                read_delay: Duration::ZERO,
                fail_precision: false,
                reads: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn with_read_delay(mut self, delay: Duration) -> Self {
            self.read_delay = delay;
            self
        }

        fn with_failing_precision(mut self) -> Self {
            self.fail_precision = true;
            self
        }

        fn read_counter(&self) -> Arc<AtomicUsize> {
            self.reads.clone()
        }
    }

    impl TemperatureProbe for ScriptedProbe {
        fn address(&self) -> &str {
            "28-000005e2fdc3"
        }

        async fn read_temperature(&mut self) -> Result<Option<f64>> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            if !self.read_delay.is_zero() {
                sleep(self.read_delay).await;
            }
            let index = self.next.min(self.script.len().saturating_sub(1));
            self.next += 1;
            Ok(self.script.get(index).copied().flatten())
        }

        async fn set_precision(&mut self, _bits: u8) -> Result<()> {
            if self.fail_precision {
                Err(SensorError::precision("simulated write failure"))
            } else {
                Ok(())
            }
        }
    }

    type Notifications = Arc<Mutex<Vec<(Severity, String, Option<Duration>)>>>;

    fn recording_notifier(
        log: Notifications,
    ) -> impl Fn(Severity, &str, Option<Duration>) {
        move |severity, message: &str, timeout| {
            log.lock().unwrap().push((severity, message.to_string(), timeout));
        }
    }

    fn stop_after(
        flag: RunFlag,
        count: usize,
        readings: Arc<Mutex<Vec<TemperatureReading>>>,
    ) -> impl FnMut(TemperatureReading) {
        move |reading| {
            let mut seen = readings.lock().unwrap();
            seen.push(reading);
            if seen.len() >= count {
                flag.stop();
            }
        }
    }

    fn test_config() -> SensorConfig {
        SensorConfig::new("28-000005e2fdc3")
            .with_update_interval(Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn loop_holds_a_fixed_cadence_despite_read_latency() {
        let flag = RunFlag::new();
        let readings = Arc::new(Mutex::new(Vec::new()));
        let probe = ScriptedProbe::new(vec![Some(25.0)])
            .with_read_delay(Duration::from_millis(500));
        let mut poller = SensorPoller::new(
            test_config(),
            probe,
            stop_after(flag.clone(), 3, readings.clone()),
            TracingNotifierStub,
        );

        let start = Instant::now();
        poller.run(&flag).await.unwrap();

        // 2 s settle, then three 2 s iterations: each reads for 0.5 s and
        // sleeps out the remaining 1.5 s.
        assert_eq!(start.elapsed(), Duration::from_secs(8));
        assert_eq!(readings.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_skips_the_sleep_and_notifies() {
        let flag = RunFlag::new();
        let readings = Arc::new(Mutex::new(Vec::new()));
        let notifications: Notifications = Arc::new(Mutex::new(Vec::new()));
        let probe = ScriptedProbe::new(vec![Some(25.0)])
            .with_read_delay(Duration::from_millis(2500));
        let mut poller = SensorPoller::new(
            test_config(),
            probe,
            stop_after(flag.clone(), 2, readings.clone()),
            recording_notifier(notifications.clone()),
        );

        let start = Instant::now();
        poller.run(&flag).await.unwrap();

        // 2 s settle plus two back-to-back 2.5 s iterations, no sleep.
        assert_eq!(start.elapsed(), Duration::from_millis(2000 + 2 * 2500));

        let overruns: Vec<_> = notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, msg, _)| msg.contains("could not complete"))
            .cloned()
            .collect();
        assert_eq!(overruns.len(), 2);
        assert_eq!(overruns[0].2, Some(Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_never_starts_the_loop() {
        let flag = RunFlag::new();
        let notifications: Notifications = Arc::new(Mutex::new(Vec::new()));
        let probe = ScriptedProbe::new(vec![Some(25.0)]);
        let reads = probe.read_counter();
        let mut poller = SensorPoller::new(
            test_config().with_alpha(1.5),
            probe,
            |_reading: TemperatureReading| panic!("no reading should be emitted"),
            recording_notifier(notifications.clone()),
        );

        let result = poller.run(&flag).await;
        assert!(matches!(result, Err(SensorError::Config(_))));
        assert_eq!(reads.load(Ordering::Relaxed), 0);

        let notifications = notifications.lock().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].0, Severity::Danger);
        assert_eq!(notifications[0].2, None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_precision_write_is_soft() {
        let flag = RunFlag::new();
        let readings = Arc::new(Mutex::new(Vec::new()));
        let notifications: Notifications = Arc::new(Mutex::new(Vec::new()));
        let probe = ScriptedProbe::new(vec![Some(25.0)]).with_failing_precision();
        let mut poller = SensorPoller::new(
            test_config(),
            probe,
            stop_after(flag.clone(), 1, readings.clone()),
            recording_notifier(notifications.clone()),
        );

        poller.run(&flag).await.unwrap();

        assert_eq!(readings.lock().unwrap().len(), 1);
        let notifications = notifications.lock().unwrap();
        assert!(notifications
            .iter()
            .any(|(severity, msg, _)| *severity == Severity::Warning
                && msg.contains("Could not change precision")));
    }

    #[tokio::test(start_paused = true)]
    async fn sentinel_reading_warns_and_never_reaches_the_filter() {
        let flag = RunFlag::new();
        let readings = Arc::new(Mutex::new(Vec::new()));
        let notifications: Notifications = Arc::new(Mutex::new(Vec::new()));
        let probe = ScriptedProbe::new(vec![Some(85.0), Some(25.0)]);
        let mut poller = SensorPoller::new(
            test_config(),
            probe,
            stop_after(flag.clone(), 1, readings.clone()),
            recording_notifier(notifications.clone()),
        );

        poller.run(&flag).await.unwrap();

        // 85 °C is the power-on default, not a measurement: warned, always
        // notified (no timeout), and never emitted.
        let readings = readings.lock().unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 25.0);

        let notifications = notifications.lock().unwrap();
        let comm: Vec<_> = notifications
            .iter()
            .filter(|(_, msg, _)| msg.contains("Communication error"))
            .collect();
        assert_eq!(comm.len(), 1);
        assert_eq!(comm[0].2, None);
    }

    #[tokio::test(start_paused = true)]
    async fn not_ready_iterations_are_silent() {
        let flag = RunFlag::new();
        let readings = Arc::new(Mutex::new(Vec::new()));
        let notifications: Notifications = Arc::new(Mutex::new(Vec::new()));
        let probe = ScriptedProbe::new(vec![None, None, Some(25.0)]);
        let mut poller = SensorPoller::new(
            test_config(),
            probe,
            stop_after(flag.clone(), 1, readings.clone()),
            recording_notifier(notifications.clone()),
        );

        poller.run(&flag).await.unwrap();

        assert_eq!(readings.lock().unwrap().len(), 1);
        assert!(notifications.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_readings_leave_the_smoothing_memory_intact() {
        let run = |script: Vec<Option<f64>>, expected: usize| async move {
            let flag = RunFlag::new();
            let readings = Arc::new(Mutex::new(Vec::new()));
            let probe = ScriptedProbe::new(script);
            let mut poller = SensorPoller::new(
                test_config().with_alpha(0.4).with_notify_timeouts(
                    Duration::ZERO,
                    Duration::ZERO,
                ),
                probe,
                stop_after(flag.clone(), expected, readings.clone()),
                TracingNotifierStub,
            );
            poller.run(&flag).await.unwrap();
            let values: Vec<f64> =
                readings.lock().unwrap().iter().map(|r| r.value).collect();
            values
        };

        let with_outlier = run(vec![Some(30.0), Some(250.0), Some(35.0)], 2).await;
        let without_outlier = run(vec![Some(30.0), Some(35.0)], 2).await;
        assert_eq!(with_outlier, without_outlier);
    }

    #[tokio::test(start_paused = true)]
    async fn escalation_fires_once_after_51_filtered_readings() {
        let flag = RunFlag::new();
        let notifications: Notifications = Arc::new(Mutex::new(Vec::new()));
        let notify_flag = flag.clone();
        let log = notifications.clone();
        // Per-class channels disabled; only the escalation may come through.
        let notifier = move |severity: Severity, message: &str, timeout: Option<Duration>| {
            log.lock()
                .unwrap()
                .push((severity, message.to_string(), timeout));
            notify_flag.stop();
        };
        let probe = ScriptedProbe::new(vec![Some(150.0)]);
        let mut poller = SensorPoller::new(
            test_config()
                .with_update_interval(Duration::from_secs(1))
                .with_notify_timeouts(Duration::ZERO, Duration::ZERO),
            probe,
            |_reading: TemperatureReading| panic!("nothing should pass the filter"),
            notifier,
        );

        poller.run(&flag).await.unwrap();

        let notifications = notifications.lock().unwrap();
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].1.contains("More than 50 warnings"));
    }

    /// Notifier that drops everything; for tests that only watch readings.
    struct TracingNotifierStub;

    impl NotificationSink for TracingNotifierStub {
        fn notify(&self, _severity: Severity, _message: &str, _timeout: Option<Duration>) {}
    }
}
