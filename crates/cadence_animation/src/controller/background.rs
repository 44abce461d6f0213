//! Controller running on its own thread
//!
//! The worker pulses at the configured frame rate whether or not the owner's
//! thread is busy. Callbacks (controller callbacks as well as an animation's
//! own update and completion callbacks) run on the worker, or are queued for
//! the owner when the config asks for [`CallbackContext::Owner`].

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{Completion, Controller, ControllerHandle, Registry, WakeCallback};
use crate::config::{CallbackContext, ControllerConfig, TeardownPolicy};
use crate::error::{AnimationError, Result};
use crate::frame_rate::FrameRateCalculator;

const THREAD_NAME: &str = "cadence-animation";

enum Delivery {
    Worker,
    Owner {
        queue: Sender<Completion>,
        wake: Option<WakeCallback>,
    },
}

impl Delivery {
    fn deliver(&self, completions: Vec<Completion>) {
        if completions.is_empty() {
            return;
        }
        match self {
            Delivery::Worker => {
                for completion in completions {
                    completion.fire();
                }
            }
            Delivery::Owner { queue, wake } => {
                for completion in completions {
                    // owner gone: nobody is left to call
                    if queue.send(completion).is_err() {
                        return;
                    }
                }
                if let Some(wake) = wake {
                    wake();
                }
            }
        }
    }
}

/// Controller that pulses on a dedicated worker thread
///
/// ```ignore
/// let controller = AsyncController::spawn(ControllerConfig::default())?;
/// let mut animator = Animator::new(controller);
/// animator.add(Animation::linear([0.0], [1.0], 0.3)?, None, None)?;
/// ```
pub struct AsyncController {
    handle: ControllerHandle,
    config: ControllerConfig,
    stop_flag: Arc<AtomicBool>,
    /// Latest frame-rate estimate, stored as `f32` bits
    frame_rate: Arc<AtomicU32>,
    /// Target time between pulses, in nanoseconds
    interval: Arc<AtomicU64>,
    thread: Option<JoinHandle<Registry>>,
    pending: Option<Receiver<Completion>>,
}

impl AsyncController {
    /// Start the worker thread
    pub fn spawn(config: ControllerConfig) -> Result<Self> {
        Self::start(config, None)
    }

    /// Start the worker thread with a callback that nudges the owner's event
    /// loop whenever owner-side callbacks are queued (called on the worker)
    pub fn spawn_with_wake<F>(config: ControllerConfig, wake: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::start(config, Some(Arc::new(wake)))
    }

    fn start(config: ControllerConfig, wake: Option<WakeCallback>) -> Result<Self> {
        config.validate()?;
        let (mut registry, handle) = Registry::new();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let frame_rate = Arc::new(AtomicU32::new(0.0f32.to_bits()));
        let interval = Arc::new(AtomicU64::new(interval_nanos(&config)));

        let (delivery, pending) = match config.callback_context {
            CallbackContext::Worker => (Delivery::Worker, None),
            CallbackContext::Owner => {
                registry.defer_callbacks();
                let (tx, rx) = mpsc::channel();
                (Delivery::Owner { queue: tx, wake }, Some(rx))
            }
        };

        let window = config.frame_window;
        let stop = Arc::clone(&stop_flag);
        let rate = Arc::clone(&frame_rate);
        let period = Arc::clone(&interval);

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                tracing::debug!(interval_ns = period.load(Ordering::Relaxed), "animation thread started");
                let mut frames = FrameRateCalculator::with_window(window);
                let mut last: Option<Instant> = None;

                while !stop.load(Ordering::Acquire) {
                    let start = Instant::now();
                    let delta = last.map_or(Duration::ZERO, |last| start - last);
                    if last.is_some() {
                        frames.record_interval(delta);
                        rate.store(frames.estimate().to_bits(), Ordering::Relaxed);
                    }
                    last = Some(start);

                    delivery.deliver(registry.pulse(delta.as_secs_f32()));

                    let interval = Duration::from_nanos(period.load(Ordering::Relaxed));
                    let elapsed = start.elapsed();
                    if elapsed < interval {
                        thread::sleep(interval - elapsed);
                    }
                }

                tracing::debug!("animation thread stopped");
                registry
            })
            .map_err(|e| AnimationError::Thread(e.to_string()))?;

        Ok(Self {
            handle,
            config,
            stop_flag,
            frame_rate,
            interval,
            thread: Some(thread),
            pending,
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Run the callbacks queued for the owner thread
    ///
    /// Only queues in [`CallbackContext::Owner`] mode; returns how many ran.
    pub fn dispatch_pending(&self) -> usize {
        let Some(pending) = &self.pending else {
            return 0;
        };
        let mut count = 0;
        for completion in pending.try_iter() {
            completion.fire();
            count += 1;
        }
        count
    }

    /// Stop the worker and take back the registry
    fn join(&mut self) -> Option<Registry> {
        let thread = self.thread.take()?;
        self.stop_flag.store(true, Ordering::Release);
        match thread.join() {
            Ok(registry) => Some(registry),
            Err(_) => {
                tracing::warn!("animation thread panicked");
                None
            }
        }
    }
}

fn interval_nanos(config: &ControllerConfig) -> u64 {
    u64::try_from(config.interval().as_nanos()).unwrap_or(u64::MAX)
}

impl Controller for AsyncController {
    fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn frame_rate(&self) -> f32 {
        f32::from_bits(self.frame_rate.load(Ordering::Relaxed))
    }

    /// Picked up by the worker after its current pulse
    fn set_frame_rate(&mut self, frame_rate: u32) -> Result<()> {
        let config = self.config.clone().frame_rate(frame_rate);
        config.validate()?;
        self.interval.store(interval_nanos(&config), Ordering::Relaxed);
        self.config = config;
        tracing::debug!(frame_rate, "animation frame rate changed");
        Ok(())
    }

    /// Completions queued before the worker stopped are dispatched first
    fn shutdown(&mut self, policy: TeardownPolicy) {
        let Some(mut registry) = self.join() else {
            return;
        };
        self.dispatch_pending();
        for completion in registry.shutdown(policy) {
            completion.fire();
        }
    }
}

impl Drop for AsyncController {
    fn drop(&mut self) {
        if let Some(mut registry) = self.join() {
            registry.shutdown(TeardownPolicy::Silent);
        }
    }
}
