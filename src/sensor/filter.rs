//! Range filtering and exponential moving average smoothing.

/// Result of pushing one calibrated value through the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOutcome {
    /// The value was in range; carries the smoothed value rounded to one
    /// decimal place, ready for emission.
    Accepted(f64),
    /// The value was outside the plausibility bounds; carries the rejected
    /// value rounded to one decimal place for logging and notification.
    Rejected(f64),
}

/// Stateful plausibility filter with EMA smoothing.
///
/// Holds at most one previous smoothed value. Rejected readings never touch
/// that state, so a single outlier cannot corrupt the smoothing memory.
/// Rounding happens only at emission; the retained state keeps full
/// precision so error does not accumulate across iterations.
#[derive(Debug, Clone)]
pub struct EmaFilter {
    low: f64,
    high: f64,
    alpha: f64,
    last: Option<f64>,
}

impl EmaFilter {
    /// Create a filter with the given bounds and smoothing weight.
    ///
    /// Bounds are strict on both sides: a value equal to `low` or `high`
    /// counts as out of range.
    pub fn new(low: f64, high: f64, alpha: f64) -> Self {
        Self {
            low,
            high,
            alpha,
            last: None,
        }
    }

    /// The current smoothed state, if any reading has been accepted yet.
    pub fn last(&self) -> Option<f64> {
        self.last
    }

    /// Process one calibrated value.
    pub fn process(&mut self, value: f64) -> FilterOutcome {
        if self.low < value && value < self.high {
            let smoothed = match self.last {
                Some(prev) => self.alpha * value + (1.0 - self.alpha) * prev,
                None => value,
            };
            self.last = Some(smoothed);
            FilterOutcome::Accepted(round_tenth(smoothed))
        } else {
            FilterOutcome::Rejected(round_tenth(value))
        }
    }
}

/// Round to one decimal place.
fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
