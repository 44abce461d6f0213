//! Values whose progress is elapsed time

use std::f32::consts::{FRAC_PI_2, TAU};

use crate::easing::Curve;
use crate::error::{check_output, ensure_finite, AnimationError, Result};

/// Shared state of every timed value
#[derive(Clone, Debug)]
struct Timeline {
    start: f32,
    end: f32,
    /// Seconds; zero or less completes on the first advance
    duration: f32,
    current: f32,
    finished: bool,
}

impl Timeline {
    fn new(start: f32, end: f32, duration: f32) -> Result<Self> {
        Ok(Self {
            start: ensure_finite("start", start)?,
            end: ensure_finite("end", end)?,
            duration: ensure_finite("duration", duration)?,
            current: start,
            finished: false,
        })
    }

    /// Advance to `elapsed`, shaping progress (0.0 to 1.0) with `f`
    fn advance(&mut self, elapsed: f32, f: impl FnOnce(f32) -> f32) -> Result<f32> {
        if self.finished {
            return Ok(self.current);
        }
        if self.duration <= 0.0 || elapsed >= self.duration {
            self.finished = true;
            self.current = self.end;
            return Ok(self.current);
        }

        let progress = (elapsed / self.duration).clamp(0.0, 1.0);
        self.current = check_output(0, f(progress))?;
        Ok(self.current)
    }

    fn scale(&self, point: f32) -> f32 {
        self.start + point * (self.end - self.start)
    }

    fn cancel(&mut self, move_to_end: bool) {
        self.finished = true;
        if move_to_end {
            self.current = self.end;
        }
    }

    fn reset(&mut self) {
        self.current = self.start;
        self.finished = false;
    }
}

// ============================================================================
// Constant
// ============================================================================

/// A value that never changes
///
/// By default it finishes on its first advance; with a duration it holds for
/// that long, which makes it a convenient pause inside a chain.
#[derive(Clone, Debug)]
pub struct Constant {
    timeline: Timeline,
}

impl Constant {
    pub fn new(value: f32) -> Result<Self> {
        Self::with_duration(value, 0.0)
    }

    /// Hold `value` for `duration` seconds
    pub fn with_duration(value: f32, duration: f32) -> Result<Self> {
        Ok(Self {
            timeline: Timeline::new(value, value, duration)?,
        })
    }

    pub(crate) fn advance(&mut self, elapsed: f32, _delta: f32) -> Result<f32> {
        let value = self.timeline.start;
        self.timeline.advance(elapsed, |_| value)
    }

    pub fn value(&self) -> f32 {
        self.timeline.current
    }

    pub fn end_value(&self) -> f32 {
        self.timeline.end
    }

    pub fn is_finished(&self) -> bool {
        self.timeline.finished
    }

    pub fn cancel(&mut self, move_to_end: bool) {
        self.timeline.cancel(move_to_end);
    }

    pub fn reset(&mut self) {
        self.timeline.reset();
    }
}

// ============================================================================
// Linear
// ============================================================================

/// Straight-line interpolation from `start` to `end` over `duration` seconds
#[derive(Clone, Debug)]
pub struct Linear {
    timeline: Timeline,
}

impl Linear {
    pub fn new(start: f32, end: f32, duration: f32) -> Result<Self> {
        Ok(Self {
            timeline: Timeline::new(start, end, duration)?,
        })
    }

    pub(crate) fn advance(&mut self, elapsed: f32, _delta: f32) -> Result<f32> {
        let (start, end) = (self.timeline.start, self.timeline.end);
        self.timeline
            .advance(elapsed, |progress| start + (end - start) * progress)
    }

    pub fn value(&self) -> f32 {
        self.timeline.current
    }

    pub fn end_value(&self) -> f32 {
        self.timeline.end
    }

    pub fn is_finished(&self) -> bool {
        self.timeline.finished
    }

    pub fn cancel(&mut self, move_to_end: bool) {
        self.timeline.cancel(move_to_end);
    }

    pub fn reset(&mut self) {
        self.timeline.reset();
    }
}

// ============================================================================
// Parametric
// ============================================================================

/// Interpolation shaped by an easing curve or a user function
///
/// The curve maps progress (0.0 to 1.0) onto a curve point that is then scaled
/// into the `start..end` range. Curves may overshoot the range (back, elastic).
#[derive(Clone, Debug)]
pub struct Parametric {
    timeline: Timeline,
    curve: Curve,
}

impl Parametric {
    pub fn new(start: f32, end: f32, duration: f32, curve: impl Into<Curve>) -> Result<Self> {
        Ok(Self {
            timeline: Timeline::new(start, end, duration)?,
            curve: curve.into(),
        })
    }

    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    pub(crate) fn advance(&mut self, elapsed: f32, _delta: f32) -> Result<f32> {
        let Self { timeline, curve } = self;
        let (start, end) = (timeline.start, timeline.end);
        timeline.advance(elapsed, |progress| {
            start + (end - start) * curve.apply(progress)
        })
    }

    pub fn value(&self) -> f32 {
        self.timeline.current
    }

    pub fn end_value(&self) -> f32 {
        self.timeline.end
    }

    pub fn is_finished(&self) -> bool {
        self.timeline.finished
    }

    pub fn cancel(&mut self, move_to_end: bool) {
        self.timeline.cancel(move_to_end);
    }

    pub fn reset(&mut self) {
        self.timeline.reset();
    }

    /// Map a curve point onto the value range
    pub fn scale(&self, point: f32) -> f32 {
        self.timeline.scale(point)
    }
}

// ============================================================================
// Sinusoid
// ============================================================================

/// How long a [`Sinusoid`] runs
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SinusoidMode {
    /// Stop after this many full cycles
    Cycles(f32),
    /// Stop after this many seconds
    Duration(f32),
    /// Never finish
    Indefinite,
}

/// `amplitude * sin(phase + TAU * frequency * elapsed) + offset`
///
/// `frequency` is in Hz and `phase` in radians. Finite modes end on the exact
/// waveform value at their end time; an indefinite wave only stops when
/// cancelled.
#[derive(Clone, Debug)]
pub struct Sinusoid {
    amplitude: f32,
    frequency: f32,
    phase: f32,
    offset: f32,
    /// None for indefinite waves
    duration: Option<f32>,
    current: f32,
    finished: bool,
}

impl Sinusoid {
    pub fn new(
        amplitude: f32,
        frequency: f32,
        phase: f32,
        offset: f32,
        mode: SinusoidMode,
    ) -> Result<Self> {
        let amplitude = ensure_finite("amplitude", amplitude)?;
        let frequency = ensure_finite("frequency", frequency)?;
        let phase = ensure_finite("phase", phase)?;
        let offset = ensure_finite("offset", offset)?;

        let duration = match mode {
            SinusoidMode::Cycles(cycles) => {
                let cycles = ensure_finite("cycles", cycles)?;
                if cycles <= 0.0 {
                    return Err(AnimationError::config("cycle count must be positive"));
                }
                if frequency <= 0.0 {
                    return Err(AnimationError::config(
                        "a cycle-limited sinusoid needs a positive frequency",
                    ));
                }
                Some(cycles / frequency)
            }
            SinusoidMode::Duration(seconds) => Some(ensure_finite("duration", seconds)?),
            SinusoidMode::Indefinite => None,
        };

        let mut wave = Self {
            amplitude,
            frequency,
            phase,
            offset,
            duration,
            current: 0.0,
            finished: false,
        };
        wave.current = wave.sample(0.0);
        Ok(wave)
    }

    /// A unit wave between two multiples of π/2
    ///
    /// `(0, 4)` is one full sine cycle, `(1, 5)` one full cosine cycle. Equal
    /// quadrants also produce one full cycle.
    pub fn from_quadrants(start_quadrant: i32, end_quadrant: i32, duration: f32) -> Result<Self> {
        let duration = ensure_finite("duration", duration)?;
        if duration <= 0.0 {
            return Err(AnimationError::config(
                "a quadrant sinusoid needs a positive duration",
            ));
        }

        let mut quadrants = end_quadrant - start_quadrant;
        if quadrants == 0 {
            quadrants = 4;
        }
        while quadrants < 0 {
            quadrants += 4;
        }

        let span = quadrants as f32 * FRAC_PI_2;
        Self::new(
            1.0,
            span / (TAU * duration),
            start_quadrant as f32 * FRAC_PI_2,
            0.0,
            SinusoidMode::Duration(duration),
        )
    }

    fn sample(&self, elapsed: f32) -> f32 {
        self.amplitude * (self.phase + TAU * self.frequency * elapsed).sin() + self.offset
    }

    pub(crate) fn advance(&mut self, elapsed: f32, _delta: f32) -> Result<f32> {
        if self.finished {
            return Ok(self.current);
        }

        if let Some(duration) = self.duration {
            if duration <= 0.0 || elapsed >= duration {
                self.current = self.end_value();
                self.finished = true;
                return Ok(self.current);
            }
        }

        self.current = check_output(0, self.sample(elapsed))?;
        Ok(self.current)
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    /// Waveform value at the end time; the current value for indefinite waves
    pub fn end_value(&self) -> f32 {
        match self.duration {
            Some(duration) => self.sample(duration.max(0.0)),
            None => self.current,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_indefinite(&self) -> bool {
        self.duration.is_none()
    }

    pub fn cancel(&mut self, move_to_end: bool) {
        if move_to_end {
            self.current = self.end_value();
        }
        self.finished = true;
    }

    pub fn reset(&mut self) {
        self.current = self.sample(0.0);
        self.finished = false;
    }
}
