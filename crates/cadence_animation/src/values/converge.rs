//! Values that converge on a target
//!
//! Each value runs an iterative rule in fixed sub-steps of [`DEFAULT_STEP`]
//! seconds, carrying fractional time between advances, so the motion does not
//! depend on the host's frame rate.

use crate::error::{check_output, ensure_finite, AnimationError, Result};

/// Default internal step (1 kHz)
pub const DEFAULT_STEP: f32 = 0.001;

/// Upper bound on sub-steps run by a single advance
pub const MAX_SUBSTEPS: u32 = 10_000;

/// Fastest per-step fraction an [`EaseOut`] may reach
const EASE_OUT_MAX_RATE: f32 = 0.95;

/// Shared convergence state
#[derive(Clone, Debug)]
pub(crate) struct Convergence {
    pub(crate) start: f32,
    pub(crate) target: f32,
    pub(crate) tolerance: f32,
    pub(crate) current: f32,
    pub(crate) finished: bool,
    step: f32,
    carry: f32,
    running_time: f32,
    time_cap: Option<f32>,
}

impl Convergence {
    pub(crate) fn new(start: f32, target: f32, tolerance: f32) -> Result<Self> {
        let tolerance = ensure_finite("tolerance", tolerance)?;
        if tolerance <= 0.0 {
            return Err(AnimationError::config(format!(
                "tolerance must be positive, got {tolerance}"
            )));
        }
        Ok(Self {
            start: ensure_finite("start", start)?,
            target: ensure_finite("target", target)?,
            tolerance,
            current: start,
            finished: false,
            step: DEFAULT_STEP,
            carry: 0.0,
            running_time: 0.0,
            time_cap: None,
        })
    }

    pub(crate) fn set_step(&mut self, seconds: f32) -> Result<()> {
        let seconds = ensure_finite("step", seconds)?;
        if seconds <= 0.0 {
            return Err(AnimationError::config("step must be positive"));
        }
        self.step = seconds;
        Ok(())
    }

    pub(crate) fn step(&self) -> f32 {
        self.step
    }

    pub(crate) fn set_time_cap(&mut self, seconds: Option<f32>) {
        self.time_cap = seconds.filter(|s| s.is_finite());
    }

    /// Account for `delta` seconds and return how many sub-steps to run
    pub(crate) fn begin(&mut self, delta: f32) -> u32 {
        if self.finished || delta <= 0.0 {
            return 0;
        }
        self.running_time += delta;
        self.carry += delta;

        let wanted = (self.carry / self.step).floor();
        if wanted >= MAX_SUBSTEPS as f32 {
            // drop the backlog rather than stall the caller
            self.carry = 0.0;
            return MAX_SUBSTEPS;
        }
        let steps = wanted as u32;
        self.carry -= steps as f32 * self.step;
        steps
    }

    pub(crate) fn distance(&self) -> f32 {
        (self.current - self.target).abs()
    }

    pub(crate) fn within_tolerance(&self) -> bool {
        self.distance() < self.tolerance
    }

    pub(crate) fn time_capped(&self) -> bool {
        self.time_cap.is_some_and(|cap| self.running_time >= cap)
    }

    pub(crate) fn snap(&mut self) {
        self.current = self.target;
        self.finished = true;
    }

    /// Accept a candidate value, never moving away from or past the target
    pub(crate) fn accept(&mut self, candidate: f32) -> Result<()> {
        let candidate = check_output(0, candidate)?;
        let (lo, hi) = if self.target >= self.current {
            (self.current, self.target)
        } else {
            (self.target, self.current)
        };
        self.current = candidate.clamp(lo, hi);
        Ok(())
    }

    /// Run `rule` for the sub-steps covered by `delta`, then apply the finish rules
    pub(crate) fn run(&mut self, delta: f32, mut rule: impl FnMut(f32, f32) -> f32) -> Result<f32> {
        let steps = self.begin(delta);
        for _ in 0..steps {
            let candidate = rule(self.current, self.target);
            self.accept(candidate)?;
            if self.within_tolerance() {
                self.snap();
                return Ok(self.current);
            }
        }
        if steps > 0 && self.time_capped() {
            self.snap();
        }
        Ok(self.current)
    }

    pub(crate) fn cancel(&mut self, move_to_end: bool) {
        self.finished = true;
        if move_to_end {
            self.current = self.target;
        }
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.start;
        self.finished = false;
        self.carry = 0.0;
        self.running_time = 0.0;
    }
}

fn unit_rate(name: &str, rate: f32) -> Result<f32> {
    let rate = ensure_finite(name, rate)?;
    if rate <= 0.0 || rate >= 1.0 {
        return Err(AnimationError::config(format!(
            "{name} must be between 0 and 1 (exclusive), got {rate}"
        )));
    }
    Ok(rate)
}

// ============================================================================
// EaseIn
// ============================================================================

/// Exponential approach: every step covers a fixed fraction of the remaining
/// distance, so motion is fastest at the start and decelerates into the target.
#[derive(Clone, Debug)]
pub struct EaseIn {
    core: Convergence,
    rate: f32,
}

impl EaseIn {
    /// `rate` is the fraction of the remaining distance covered per step, `0 < rate < 1`
    pub fn new(start: f32, target: f32, tolerance: f32, rate: f32) -> Result<Self> {
        Ok(Self {
            core: Convergence::new(start, target, tolerance)?,
            rate: unit_rate("rate", rate)?,
        })
    }

    /// Change the internal step size (seconds)
    pub fn with_step(mut self, seconds: f32) -> Result<Self> {
        self.core.set_step(seconds)?;
        Ok(self)
    }

    /// Snap to the target once this much time has been simulated
    pub fn with_time_cap(mut self, seconds: f32) -> Self {
        self.core.set_time_cap(Some(seconds));
        self
    }

    pub(crate) fn advance(&mut self, _elapsed: f32, delta: f32) -> Result<f32> {
        let rate = self.rate;
        self.core
            .run(delta, |current, target| current + rate * (target - current))
    }

    pub fn value(&self) -> f32 {
        self.core.current
    }

    pub fn end_value(&self) -> f32 {
        self.core.target
    }

    pub fn is_finished(&self) -> bool {
        self.core.finished
    }

    pub fn cancel(&mut self, move_to_end: bool) {
        self.core.cancel(move_to_end);
    }

    pub fn reset(&mut self) {
        self.core.reset();
    }
}

// ============================================================================
// EaseOut
// ============================================================================

/// Accelerating approach: the per-step fraction starts small and grows by
/// `growth` each step (up to 0.95), so motion starts slowly, then decelerates
/// exponentially once the fraction saturates.
#[derive(Clone, Debug)]
pub struct EaseOut {
    core: Convergence,
    growth: f32,
    initial_rate: f32,
    rate: f32,
}

impl EaseOut {
    /// `growth` multiplies the per-step fraction each step and must exceed 1
    pub fn new(start: f32, target: f32, tolerance: f32, growth: f32) -> Result<Self> {
        let growth = ensure_finite("growth", growth)?;
        if growth <= 1.0 {
            return Err(AnimationError::config(format!(
                "growth must be greater than 1, got {growth}"
            )));
        }
        Ok(Self {
            core: Convergence::new(start, target, tolerance)?,
            growth,
            initial_rate: 0.01,
            rate: 0.01,
        })
    }

    /// Fraction of the remaining distance covered by the first step
    pub fn with_initial_rate(mut self, rate: f32) -> Result<Self> {
        self.initial_rate = unit_rate("initial rate", rate)?;
        self.rate = self.initial_rate;
        Ok(self)
    }

    pub fn with_step(mut self, seconds: f32) -> Result<Self> {
        self.core.set_step(seconds)?;
        Ok(self)
    }

    pub fn with_time_cap(mut self, seconds: f32) -> Self {
        self.core.set_time_cap(Some(seconds));
        self
    }

    pub(crate) fn advance(&mut self, _elapsed: f32, delta: f32) -> Result<f32> {
        let Self {
            core, growth, rate, ..
        } = self;
        core.run(delta, |current, target| {
            let next = current + *rate * (target - current);
            *rate = (*rate * *growth).min(EASE_OUT_MAX_RATE);
            next
        })
    }

    pub fn value(&self) -> f32 {
        self.core.current
    }

    pub fn end_value(&self) -> f32 {
        self.core.target
    }

    pub fn is_finished(&self) -> bool {
        self.core.finished
    }

    pub fn cancel(&mut self, move_to_end: bool) {
        self.core.cancel(move_to_end);
    }

    pub fn reset(&mut self) {
        self.core.reset();
        self.rate = self.initial_rate;
    }
}

// ============================================================================
// SmoothedValue
// ============================================================================

/// An [`EaseIn`] whose target can move while it runs
///
/// The raw target is low-pass filtered before the value chases it, so a
/// retargeted value trails the change smoothly instead of jumping.
#[derive(Clone, Debug)]
pub struct SmoothedValue {
    core: Convergence,
    rate: f32,
    target_smoothing: f32,
    filtered_target: f32,
}

impl SmoothedValue {
    /// `target_smoothing` is the per-step fraction the filtered target moves
    /// toward the raw target, `0 < target_smoothing < 1`
    pub fn new(
        start: f32,
        target: f32,
        tolerance: f32,
        rate: f32,
        target_smoothing: f32,
    ) -> Result<Self> {
        Ok(Self {
            core: Convergence::new(start, target, tolerance)?,
            rate: unit_rate("rate", rate)?,
            target_smoothing: unit_rate("target smoothing", target_smoothing)?,
            filtered_target: start,
        })
    }

    pub fn with_step(mut self, seconds: f32) -> Result<Self> {
        self.core.set_step(seconds)?;
        Ok(self)
    }

    pub fn with_time_cap(mut self, seconds: f32) -> Self {
        self.core.set_time_cap(Some(seconds));
        self
    }

    /// The filtered target the value is currently chasing
    pub fn filtered_target(&self) -> f32 {
        self.filtered_target
    }

    pub fn update_target(&mut self, target: f32) -> bool {
        if self.core.finished {
            return false;
        }
        self.core.target = target;
        true
    }

    pub(crate) fn advance(&mut self, _elapsed: f32, delta: f32) -> Result<f32> {
        let steps = self.core.begin(delta);
        for _ in 0..steps {
            let target = self.core.target;
            self.filtered_target += self.target_smoothing * (target - self.filtered_target);
            let candidate = self.core.current + self.rate * (self.filtered_target - self.core.current);
            self.core.accept(candidate)?;

            if self.core.within_tolerance()
                && (self.filtered_target - target).abs() < self.core.tolerance
            {
                self.core.snap();
                self.filtered_target = target;
                return Ok(self.core.current);
            }
        }
        if steps > 0 && self.core.time_capped() {
            self.core.snap();
            self.filtered_target = self.core.target;
        }
        Ok(self.core.current)
    }

    pub fn value(&self) -> f32 {
        self.core.current
    }

    pub fn end_value(&self) -> f32 {
        self.core.target
    }

    pub fn is_finished(&self) -> bool {
        self.core.finished
    }

    pub fn cancel(&mut self, move_to_end: bool) {
        self.core.cancel(move_to_end);
    }

    pub fn reset(&mut self) {
        self.core.reset();
        self.filtered_target = self.core.start;
    }
}
