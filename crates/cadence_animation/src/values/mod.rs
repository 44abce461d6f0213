//! Animated values
//!
//! A single scalar that changes over the lifetime of an animation. Variants
//! fall into two families that differ in how they define progress:
//!
//! - **Timed** values ([`Constant`], [`Linear`], [`Parametric`], [`Sinusoid`])
//!   compute their output from the elapsed time since they started.
//! - **Converging** values ([`EaseIn`], [`EaseOut`], [`SmoothedValue`],
//!   [`Spring`]) run an iterative rule in fixed internal sub-steps until they are
//!   within a tolerance of their target.
//!
//! Once a value reports [`AnimatedValue::is_finished`], it keeps returning the
//! same terminal value.

mod converge;
mod timed;

pub use converge::{EaseIn, EaseOut, SmoothedValue, DEFAULT_STEP, MAX_SUBSTEPS};
pub use timed::{Constant, Linear, Parametric, Sinusoid, SinusoidMode};

pub(crate) use converge::Convergence;

use crate::error::Result;
use crate::spring::Spring;

/// Any animated scalar, dispatched by variant
#[derive(Clone, Debug)]
pub enum AnimatedValue {
    Constant(Constant),
    Linear(Linear),
    Parametric(Parametric),
    Sinusoid(Sinusoid),
    EaseIn(EaseIn),
    EaseOut(EaseOut),
    Smoothed(SmoothedValue),
    Spring(Spring),
}

macro_rules! dispatch {
    ($self:ident, $v:ident => $body:expr) => {
        match $self {
            AnimatedValue::Constant($v) => $body,
            AnimatedValue::Linear($v) => $body,
            AnimatedValue::Parametric($v) => $body,
            AnimatedValue::Sinusoid($v) => $body,
            AnimatedValue::EaseIn($v) => $body,
            AnimatedValue::EaseOut($v) => $body,
            AnimatedValue::Smoothed($v) => $body,
            AnimatedValue::Spring($v) => $body,
        }
    };
}

impl AnimatedValue {
    /// Advance the value and return its new output
    ///
    /// `elapsed` is the time in seconds since this value started running (used by
    /// timed values); `delta` is the time since the previous advance (used by
    /// converging values). A finished value ignores both and returns its terminal
    /// value.
    pub fn advance(&mut self, elapsed: f32, delta: f32) -> Result<f32> {
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        dispatch!(self, v => v.advance(elapsed, delta))
    }

    /// Current output without advancing
    pub fn value(&self) -> f32 {
        dispatch!(self, v => v.value())
    }

    /// Value this animated value settles on when it completes
    pub fn end_value(&self) -> f32 {
        dispatch!(self, v => v.end_value())
    }

    pub fn is_finished(&self) -> bool {
        dispatch!(self, v => v.is_finished())
    }

    /// True for variants whose progress is elapsed time
    pub fn is_timed(&self) -> bool {
        matches!(
            self,
            AnimatedValue::Constant(_)
                | AnimatedValue::Linear(_)
                | AnimatedValue::Parametric(_)
                | AnimatedValue::Sinusoid(_)
        )
    }

    /// Stop the value where it is, or jump straight to its end value
    pub fn cancel(&mut self, move_to_end: bool) {
        dispatch!(self, v => v.cancel(move_to_end))
    }

    /// Retarget a running value
    ///
    /// Returns `false` when the variant has a fixed end point or has already
    /// finished.
    pub fn update_target(&mut self, target: f32) -> bool {
        if !target.is_finite() {
            return false;
        }
        match self {
            AnimatedValue::Smoothed(v) => v.update_target(target),
            AnimatedValue::Spring(v) => v.update_target(target),
            _ => false,
        }
    }

    /// Return to the state the value had before its first advance
    pub fn reset(&mut self) {
        dispatch!(self, v => v.reset())
    }
}

impl From<Constant> for AnimatedValue {
    fn from(v: Constant) -> Self {
        AnimatedValue::Constant(v)
    }
}

impl From<Linear> for AnimatedValue {
    fn from(v: Linear) -> Self {
        AnimatedValue::Linear(v)
    }
}

impl From<Parametric> for AnimatedValue {
    fn from(v: Parametric) -> Self {
        AnimatedValue::Parametric(v)
    }
}

impl From<Sinusoid> for AnimatedValue {
    fn from(v: Sinusoid) -> Self {
        AnimatedValue::Sinusoid(v)
    }
}

impl From<EaseIn> for AnimatedValue {
    fn from(v: EaseIn) -> Self {
        AnimatedValue::EaseIn(v)
    }
}

impl From<EaseOut> for AnimatedValue {
    fn from(v: EaseOut) -> Self {
        AnimatedValue::EaseOut(v)
    }
}

impl From<SmoothedValue> for AnimatedValue {
    fn from(v: SmoothedValue) -> Self {
        AnimatedValue::Smoothed(v)
    }
}

impl From<Spring> for AnimatedValue {
    fn from(v: Spring) -> Self {
        AnimatedValue::Spring(v)
    }
}
