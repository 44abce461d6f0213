//! Controller pumped by a host timer

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{Controller, ControllerHandle, Registry};
use crate::config::{ControllerConfig, TeardownPolicy};
use crate::error::Result;
use crate::frame_rate::FrameRateCalculator;

/// A periodic timer owned by the host
///
/// While running, the host is expected to call
/// [`TimeController::timer_callback`] roughly every `interval`.
pub trait PeriodicDriver {
    fn start(&mut self, interval: Duration);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Driver for hosts that pump the controller from their own loop
///
/// Only records the requested state; nothing is scheduled.
#[derive(Clone, Debug, Default)]
pub struct ManualDriver {
    interval: Option<Duration>,
    starts: usize,
}

impl ManualDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval requested by the last start, while running
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// How many times the controller started the driver
    pub fn starts(&self) -> usize {
        self.starts
    }
}

impl PeriodicDriver for ManualDriver {
    fn start(&mut self, interval: Duration) {
        self.interval = Some(interval);
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.interval = None;
    }

    fn is_running(&self) -> bool {
        self.interval.is_some()
    }
}

/// Source of monotonic time
pub trait MonotonicClock {
    /// Time since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Clock backed by [`Instant`]
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to; clones share the same time
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos
            .fetch_add(by.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn set(&self, to: Duration) {
        self.nanos.store(to.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

/// Controller pulsed from the host's timer callback
///
/// The driver is started as soon as work is added and stopped once the last
/// animation leaves. Each pulse advances animations by the time measured on
/// the clock since the previous pulse, not by the nominal interval.
///
/// Work added through a [`ControllerHandle`] while the driver is stopped only
/// raises a wake request: the host sees it through [`needs_wake`] or the
/// callback given to [`set_wake_callback`], and answers with
/// [`Controller::wake`].
///
/// [`needs_wake`]: TimeController::needs_wake
/// [`set_wake_callback`]: TimeController::set_wake_callback
///
/// ```ignore
/// let mut controller = TimeController::new(ManualDriver::new(), SystemClock::new(), config)?;
/// // in the host's timer:
/// controller.timer_callback();
/// ```
pub struct TimeController<D = ManualDriver, K = SystemClock> {
    registry: Registry,
    handle: ControllerHandle,
    driver: D,
    clock: K,
    frames: FrameRateCalculator,
    last_tick: Option<Duration>,
    config: ControllerConfig,
}

impl TimeController {
    /// Manually pumped controller on the system clock
    pub fn manual(config: ControllerConfig) -> Result<Self> {
        Self::new(ManualDriver::new(), SystemClock::new(), config)
    }
}

impl<D: PeriodicDriver, K: MonotonicClock> TimeController<D, K> {
    pub fn new(driver: D, clock: K, config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        let (registry, handle) = Registry::new();
        registry.set_parked(true);
        Ok(Self {
            registry,
            handle,
            driver,
            clock,
            frames: FrameRateCalculator::with_window(config.frame_window),
            last_tick: None,
            config,
        })
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    /// Animations currently registered (queued adds not yet counted)
    pub fn registered(&self) -> usize {
        self.registry.len()
    }

    /// True when work was added through a handle while the driver was stopped
    /// and [`Controller::wake`] has not been called since
    pub fn needs_wake(&self) -> bool {
        self.registry.wake_requested()
    }

    /// Called, possibly from another thread, when work arrives while the
    /// driver is stopped; the host should then call [`Controller::wake`]
    pub fn set_wake_callback<F>(&mut self, wake: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.registry.set_waker(Some(Arc::new(wake)));
    }

    /// Run one pulse; called by the host on every timer fire
    ///
    /// Returns true while animations remain and the driver keeps running.
    pub fn timer_callback(&mut self) -> bool {
        let now = self.clock.now();
        let delta = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.last_tick = Some(now);
        self.frames.record_timestamp(now);

        for completion in self.registry.pulse(delta.as_secs_f32()) {
            completion.fire();
        }

        if self.registry.is_idle() {
            self.stop_driver();
            return false;
        }
        true
    }

    fn start_driver(&mut self) {
        let now = self.clock.now();
        self.last_tick = Some(now);
        self.frames.clear();
        self.frames.record_timestamp(now);
        self.registry.set_parked(false);
        self.driver.start(self.config.interval());
        tracing::debug!(frame_rate = self.config.frame_rate, "animation timer started");
    }

    fn stop_driver(&mut self) {
        if self.driver.is_running() {
            self.driver.stop();
            self.registry.set_parked(true);
            self.last_tick = None;
            tracing::debug!("animation timer stopped");
        }
    }
}

impl<D: PeriodicDriver, K: MonotonicClock> Controller for TimeController<D, K> {
    fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn frame_rate(&self) -> f32 {
        self.frames.estimate()
    }

    fn wake(&mut self) {
        self.registry.clear_wake_request();
        if !self.driver.is_running() && !self.registry.is_idle() {
            self.start_driver();
        }
    }

    /// A running driver is restarted at the new interval
    fn set_frame_rate(&mut self, frame_rate: u32) -> Result<()> {
        let config = self.config.clone().frame_rate(frame_rate);
        config.validate()?;
        self.config = config;
        if self.driver.is_running() {
            self.driver.stop();
            self.driver.start(self.config.interval());
        }
        tracing::debug!(frame_rate, "animation frame rate changed");
        Ok(())
    }

    fn shutdown(&mut self, policy: TeardownPolicy) {
        self.stop_driver();
        for completion in self.registry.shutdown(policy) {
            completion.fire();
        }
    }
}
