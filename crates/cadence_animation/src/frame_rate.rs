//! Rolling frame-rate estimate
//!
//! Keeps the most recent inter-tick intervals in a fixed-size ring with a
//! running sum, so each record and each estimate is O(1).

use std::time::Duration;

/// Number of intervals averaged by default
pub const DEFAULT_WINDOW: usize = 24;

/// Estimates ticks per second from recent tick intervals
#[derive(Clone, Debug)]
pub struct FrameRateCalculator {
    intervals: Vec<f32>,
    window: usize,
    next: usize,
    sum: f32,
    last_timestamp: Option<Duration>,
}

impl Default for FrameRateCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRateCalculator {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Average over the last `window` intervals (at least one)
    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        Self {
            intervals: Vec::with_capacity(window),
            window,
            next: 0,
            sum: 0.0,
            last_timestamp: None,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of intervals currently in the window
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Record the time between two ticks
    pub fn record_interval(&mut self, interval: Duration) {
        let secs = interval.as_secs_f32();
        if self.intervals.len() < self.window {
            self.intervals.push(secs);
        } else {
            self.sum -= self.intervals[self.next];
            self.intervals[self.next] = secs;
        }
        self.sum += secs;
        self.next = (self.next + 1) % self.window;
    }

    /// Record a tick at monotonic time `timestamp`
    ///
    /// The first timestamp only primes the calculator.
    pub fn record_timestamp(&mut self, timestamp: Duration) {
        if let Some(last) = self.last_timestamp {
            self.record_interval(timestamp.saturating_sub(last));
        }
        self.last_timestamp = Some(timestamp);
    }

    /// Ticks per second, or 0.0 with nothing (or only zero intervals) recorded
    pub fn estimate(&self) -> f32 {
        // the running sum drifts slightly with float error; never let it go negative
        let sum = self.sum.max(0.0);
        if self.intervals.is_empty() || sum <= f32::EPSILON {
            return 0.0;
        }
        self.intervals.len() as f32 / sum
    }

    /// Forget every recorded interval and the last timestamp
    pub fn clear(&mut self) {
        self.intervals.clear();
        self.next = 0;
        self.sum = 0.0;
        self.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_start_is_zero() {
        let calc = FrameRateCalculator::new();
        assert_eq!(calc.estimate(), 0.0);
        assert!(calc.is_empty());
    }

    #[test]
    fn test_constant_interval_converges() {
        let mut calc = FrameRateCalculator::new();
        for _ in 0..100 {
            calc.record_interval(Duration::from_micros(16_667));
        }
        assert_eq!(calc.len(), DEFAULT_WINDOW);
        assert!((calc.estimate() - 60.0).abs() < 0.1);
    }

    #[test]
    fn test_window_forgets_old_intervals() {
        let mut calc = FrameRateCalculator::with_window(4);
        for _ in 0..4 {
            calc.record_interval(Duration::from_millis(100));
        }
        assert!((calc.estimate() - 10.0).abs() < 0.01);

        for _ in 0..4 {
            calc.record_interval(Duration::from_millis(20));
        }
        assert!((calc.estimate() - 50.0).abs() < 0.1);
    }

    #[test]
    fn test_partial_window_averages_what_it_has() {
        let mut calc = FrameRateCalculator::new();
        calc.record_interval(Duration::from_millis(10));
        calc.record_interval(Duration::from_millis(30));
        assert!((calc.estimate() - 50.0).abs() < 0.1);
    }

    #[test]
    fn test_timestamps_prime_then_record() {
        let mut calc = FrameRateCalculator::new();
        calc.record_timestamp(Duration::from_millis(1_000));
        assert_eq!(calc.estimate(), 0.0);

        calc.record_timestamp(Duration::from_millis(1_025));
        calc.record_timestamp(Duration::from_millis(1_050));
        assert_eq!(calc.len(), 2);
        assert!((calc.estimate() - 40.0).abs() < 0.1);
    }

    #[test]
    fn test_zero_intervals_are_not_infinite() {
        let mut calc = FrameRateCalculator::new();
        calc.record_interval(Duration::ZERO);
        calc.record_interval(Duration::ZERO);
        assert_eq!(calc.estimate(), 0.0);
    }

    #[test]
    fn test_clear() {
        let mut calc = FrameRateCalculator::with_window(0);
        assert_eq!(calc.window(), 1);
        calc.record_timestamp(Duration::from_millis(5));
        calc.record_timestamp(Duration::from_millis(10));
        calc.clear();
        assert!(calc.is_empty());
        assert_eq!(calc.estimate(), 0.0);
        calc.record_timestamp(Duration::from_millis(20));
        assert!(calc.is_empty());
    }
}
