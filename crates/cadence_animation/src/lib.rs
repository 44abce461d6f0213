//! Cadence Animation Engine
//!
//! Frame-rate independent value generation and scheduling.
//!
//! # Features
//!
//! - **Timed values**: constant, linear, eased (named curves or closures) and sinusoidal
//! - **Converging values**: ease-in, ease-out, smoothed targets and RK4 springs,
//!   stepped at a fixed internal rate so results do not depend on the tick rate
//! - **Animations**: `N` values advanced in lockstep with update and completion callbacks
//! - **Chains and sequences**: animations run back to back
//! - **Controllers**: host-timer driven ([`TimeController`]) or on a worker thread
//!   ([`AsyncController`]), behind a single [`Animator`] facade
//!
//! ```ignore
//! use cadence_animation::{Animation, Animator, ControllerConfig, TimeController};
//!
//! let mut animator = Animator::new(TimeController::manual(ControllerConfig::default())?);
//! let id = animator.add(Animation::linear([0.0], [1.0], 0.25)?, None, None)?;
//! // host timer:
//! animator.controller_mut().timer_callback();
//! let opacity = animator.values(id);
//! ```

pub mod animation;
pub mod animator;
pub mod chain;
pub mod config;
pub mod controller;
pub mod easing;
pub mod error;
pub mod frame_rate;
pub mod spring;
pub mod values;

pub use animation::{Animation, AnimationId, AnimationType, CallbackQueue, DeferredCall, TickStatus};
pub use animator::Animator;
pub use chain::{Chain, Sequence};
pub use config::{CallbackContext, ControllerConfig, TeardownPolicy};
pub use controller::{
    AnimationEvent, AsyncController, Callback, Controller, ControllerHandle, ManualClock,
    ManualDriver, MonotonicClock, Outcome, PeriodicDriver, SystemClock, TimeController, ValueList,
    WakeCallback,
};
pub use easing::{Curve, Easing};
pub use error::{AnimationError, ConfigError, Result};
pub use frame_rate::FrameRateCalculator;
pub use spring::{Spring, SpringConfig};
pub use values::{
    AnimatedValue, Constant, EaseIn, EaseOut, Linear, Parametric, Sinusoid, SinusoidMode,
    SmoothedValue,
};
