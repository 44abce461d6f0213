//! Animation controllers
//!
//! A controller owns the registry of running animations and pulses it: every
//! pulse drains queued commands, advances each animation once in registration
//! order, removes the ones that finished or failed, publishes a value snapshot
//! and finally hands completion events back to be fired with no lock held.
//!
//! Two controllers share this core:
//! - [`TimeController`] is pumped by a host timer through [`PeriodicDriver`]
//! - [`AsyncController`] pulses on its own worker thread
//!
//! All mutation goes through a [`ControllerHandle`], which is cheap to clone and
//! can be captured by callbacks to schedule follow-up animations. Commands sent
//! through a handle take effect at the start of the next pulse. Adding to a
//! controller that has stopped pulsing raises a wake request (see
//! [`TimeController::set_wake_callback`]).

mod background;
mod time;

pub use background::AsyncController;
pub use time::{ManualClock, ManualDriver, MonotonicClock, PeriodicDriver, SystemClock, TimeController};

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::animation::{AnimationId, AnimationType, CallbackQueue, DeferredCall, TickStatus};
use crate::config::{ControllerConfig, TeardownPolicy};
use crate::error::{AnimationError, Result};

/// Snapshot of an animation's values
pub type ValueList = SmallVec<[f32; 4]>;

/// Receives the final event of a registered animation
pub type Callback = Box<dyn FnOnce(AnimationEvent) + Send>;

/// Nudges the owner's event loop; may be called from any thread
pub type WakeCallback = Arc<dyn Fn() + Send + Sync>;

/// How a registered animation left the controller
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Every value reached its end
    Finished,
    /// Advancing raised a runtime error; the animation was removed
    Failed(AnimationError),
    /// Removed by teardown while still running
    Cancelled,
}

/// Delivered to an animation's callback when it leaves the controller
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationEvent {
    pub id: AnimationId,
    pub outcome: Outcome,
    /// Values at the time the animation was removed
    pub values: ValueList,
}

/// Common surface of the controllers an [`Animator`](crate::Animator) can own
pub trait Controller {
    /// Handle for adding, cancelling and querying animations
    fn handle(&self) -> ControllerHandle;

    fn config(&self) -> &ControllerConfig;

    /// Measured ticks per second (0.0 until enough ticks were seen)
    fn frame_rate(&self) -> f32;

    /// Make sure pulses are being scheduled after work was added
    fn wake(&mut self) {}

    /// Change the tick rate of a running controller
    fn set_frame_rate(&mut self, frame_rate: u32) -> Result<()>;

    /// Stop pulsing and dispose of every remaining animation
    fn shutdown(&mut self, policy: TeardownPolicy);
}

// ============================================================================
// Handle
// ============================================================================

pub(crate) enum Command {
    Add {
        id: AnimationId,
        animation: Box<dyn AnimationType>,
        callback: Option<Callback>,
    },
    Cancel {
        id: AnimationId,
        move_to_end: bool,
    },
    CancelAll {
        move_to_end: bool,
    },
    UpdateTarget {
        id: AnimationId,
        index: usize,
        target: f32,
    },
}

/// State readable from any thread
///
/// Lock order: `live` before `cancelling`.
#[derive(Default)]
pub(crate) struct Shared {
    /// Ids registered or queued for registration
    live: Mutex<FxHashSet<AnimationId>>,
    /// Live ids with a cancel queued
    cancelling: Mutex<FxHashSet<AnimationId>>,
    values: Mutex<FxHashMap<AnimationId, ValueList>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    /// The controller is not pulsing and must be woken for new work
    parked: AtomicBool,
    wake_requested: AtomicBool,
    waker: Mutex<Option<WakeCallback>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn reserve(&self, requested: Option<AnimationId>) -> Result<AnimationId> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AnimationError::ControllerClosed);
        }
        let mut live = lock(&self.live);
        let id = match requested {
            Some(id) if live.contains(&id) => return Err(AnimationError::IdInUse(id)),
            Some(id) => id,
            None => loop {
                let candidate = AnimationId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
                if !live.contains(&candidate) {
                    break candidate;
                }
            },
        };
        live.insert(id);
        Ok(id)
    }

    fn release(&self, id: AnimationId) {
        {
            let mut live = lock(&self.live);
            live.remove(&id);
            lock(&self.cancelling).remove(&id);
        }
        lock(&self.values).remove(&id);
    }

    /// False for unknown ids and ids already being cancelled
    fn mark_cancelled(&self, id: AnimationId) -> bool {
        let live = lock(&self.live);
        live.contains(&id) && lock(&self.cancelling).insert(id)
    }

    fn mark_all_cancelled(&self) {
        let live = lock(&self.live);
        lock(&self.cancelling).extend(live.iter().copied());
    }

    fn request_wake(&self) {
        if !self.parked.load(Ordering::Acquire) || self.wake_requested.swap(true, Ordering::AcqRel)
        {
            return;
        }
        let waker = lock(&self.waker).clone();
        if let Some(waker) = waker {
            waker();
        }
    }

    fn is_live(&self, id: AnimationId) -> bool {
        lock(&self.live).contains(&id)
    }

    fn live_count(&self) -> usize {
        lock(&self.live).len()
    }
}

/// Cloneable access to a controller's registry
///
/// Handles are `Send`, so completion callbacks (even ones running on a
/// worker thread) can hold one and schedule further animations.
#[derive(Clone)]
pub struct ControllerHandle {
    commands: Sender<Command>,
    shared: Arc<Shared>,
}

impl ControllerHandle {
    /// Register an animation
    ///
    /// Without an explicit id the controller picks one; an explicit id that is
    /// still registered fails with [`AnimationError::IdInUse`]. The animation
    /// is ticked from the next pulse on.
    pub fn add<A>(
        &self,
        mut animation: A,
        id: Option<AnimationId>,
        callback: Option<Callback>,
    ) -> Result<AnimationId>
    where
        A: AnimationType + 'static,
    {
        let id = self.shared.reserve(id)?;
        animation.assign_id(id);
        let command = Command::Add {
            id,
            animation: Box::new(animation),
            callback,
        };
        if self.commands.send(command).is_err() {
            self.shared.release(id);
            return Err(AnimationError::ControllerClosed);
        }
        tracing::debug!(%id, "animation queued");
        self.shared.request_wake();
        Ok(id)
    }

    /// Remove an animation without calling its callback
    ///
    /// With `move_to_end` the animation jumps to its end values and reports
    /// them through one last update. Returns false for unknown ids and for ids
    /// whose cancel is already queued. The animation stops at the start of the
    /// next pulse; until then it still counts as running.
    pub fn cancel(&self, id: AnimationId, move_to_end: bool) -> bool {
        self.shared.mark_cancelled(id)
            && self
                .commands
                .send(Command::Cancel { id, move_to_end })
                .is_ok()
    }

    /// Cancel everything registered or queued so far
    pub fn cancel_all(&self, move_to_end: bool) {
        self.shared.mark_all_cancelled();
        let _ = self.commands.send(Command::CancelAll { move_to_end });
    }

    /// Queue a retarget of value `index`; false for unknown ids
    pub fn update_target(&self, id: AnimationId, index: usize, target: f32) -> bool {
        self.shared.is_live(id)
            && self
                .commands
                .send(Command::UpdateTarget { id, index, target })
                .is_ok()
    }

    pub fn is_running(&self, id: AnimationId) -> bool {
        self.shared.is_live(id)
    }

    /// Values published by the most recent pulse
    pub fn values(&self, id: AnimationId) -> Option<ValueList> {
        lock(&self.shared.values).get(&id).cloned()
    }

    /// Registered animations, including ones queued for the next pulse
    pub fn len(&self) -> usize {
        self.shared.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("live", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// A callback ready to fire, produced by a pulse or a teardown
pub(crate) enum Completion {
    /// An animation left the registry
    Event {
        event: AnimationEvent,
        callback: Option<Callback>,
    },
    /// An animation's own update or completion callback, held back by
    /// [`Registry::defer_callbacks`]
    Call(DeferredCall),
}

impl Completion {
    pub(crate) fn fire(self) {
        match self {
            Completion::Event {
                event,
                callback: Some(callback),
            } => callback(event),
            Completion::Event { callback: None, .. } => {}
            Completion::Call(call) => call(),
        }
    }

    #[cfg(test)]
    pub(crate) fn event(&self) -> Option<&AnimationEvent> {
        match self {
            Completion::Event { event, .. } => Some(event),
            Completion::Call(_) => None,
        }
    }
}

struct Entry {
    animation: Box<dyn AnimationType>,
    callback: Option<Callback>,
}

/// Registered animations in registration order, owned by the pulsing thread
pub(crate) struct Registry {
    entries: IndexMap<AnimationId, Entry>,
    commands: Receiver<Command>,
    shared: Arc<Shared>,
    deferred: Option<CallbackQueue>,
}

impl Registry {
    pub(crate) fn new() -> (Self, ControllerHandle) {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared::default());
        let registry = Self {
            entries: IndexMap::new(),
            commands: rx,
            shared: Arc::clone(&shared),
            deferred: None,
        };
        (registry, ControllerHandle { commands: tx, shared })
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered or queued
    pub(crate) fn is_idle(&self) -> bool {
        self.shared.live_count() == 0
    }

    /// Hand animation callbacks back from `pulse` instead of running them
    /// while ticking
    pub(crate) fn defer_callbacks(&mut self) {
        self.deferred = Some(CallbackQueue::new());
    }

    pub(crate) fn set_parked(&self, parked: bool) {
        self.shared.parked.store(parked, Ordering::Release);
    }

    pub(crate) fn wake_requested(&self) -> bool {
        self.shared.wake_requested.load(Ordering::Acquire)
    }

    pub(crate) fn clear_wake_request(&self) {
        self.shared.wake_requested.store(false, Ordering::Release);
    }

    pub(crate) fn set_waker(&self, waker: Option<WakeCallback>) {
        *lock(&self.shared.waker) = waker;
    }

    fn remove(&mut self, id: AnimationId) -> Option<Entry> {
        let entry = self.entries.shift_remove(&id)?;
        self.shared.release(id);
        Some(entry)
    }

    fn cancel(&mut self, id: AnimationId, move_to_end: bool) {
        if let Some(mut entry) = self.remove(id) {
            entry.animation.cancel(move_to_end);
            tracing::debug!(%id, move_to_end, "animation cancelled");
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Add {
                    id,
                    mut animation,
                    callback,
                } => {
                    if let Some(queue) = &self.deferred {
                        animation.defer_callbacks(queue.clone());
                    }
                    lock(&self.shared.values).insert(id, ValueList::from_slice(animation.values()));
                    self.entries.insert(id, Entry { animation, callback });
                }
                Command::Cancel { id, move_to_end } => self.cancel(id, move_to_end),
                Command::CancelAll { move_to_end } => {
                    let ids: Vec<AnimationId> = self.entries.keys().copied().collect();
                    tracing::debug!(count = ids.len(), move_to_end, "cancelling all animations");
                    for id in ids {
                        self.cancel(id, move_to_end);
                    }
                }
                Command::UpdateTarget { id, index, target } => {
                    if let Some(entry) = self.entries.get_mut(&id) {
                        if !entry.animation.update_target(index, target) {
                            tracing::debug!(%id, index, "update_target ignored");
                        }
                    }
                }
            }
        }
    }

    /// Advance every animation by `delta` seconds
    pub(crate) fn pulse(&mut self, delta: f32) -> Vec<Completion> {
        self.apply_commands();

        let mut done: Vec<(AnimationId, Outcome)> = Vec::new();
        for (id, entry) in self.entries.iter_mut() {
            match entry.animation.tick(delta) {
                Ok(TickStatus::Running) => {}
                Ok(TickStatus::Finished) => done.push((*id, Outcome::Finished)),
                Err(error) => {
                    tracing::warn!(%id, %error, "animation failed");
                    done.push((*id, Outcome::Failed(error)));
                }
            }
        }

        {
            let mut values = lock(&self.shared.values);
            for (id, entry) in &self.entries {
                values.insert(*id, ValueList::from_slice(entry.animation.values()));
            }
        }

        let mut completions: Vec<Completion> = match &self.deferred {
            Some(queue) => queue.take().into_iter().map(Completion::Call).collect(),
            None => Vec::with_capacity(done.len()),
        };
        for (id, outcome) in done {
            if let Some(entry) = self.remove(id) {
                completions.push(Completion::Event {
                    event: AnimationEvent {
                        id,
                        outcome,
                        values: ValueList::from_slice(entry.animation.values()),
                    },
                    callback: entry.callback,
                });
            }
        }
        tracing::trace!(
            delta,
            running = self.entries.len(),
            completed = completions.len(),
            "pulse"
        );
        completions
    }

    /// Close the registry and remove everything still in it
    pub(crate) fn shutdown(&mut self, policy: TeardownPolicy) -> Vec<Completion> {
        self.shared.closed.store(true, Ordering::Release);
        self.apply_commands();

        let entries = std::mem::take(&mut self.entries);
        tracing::debug!(remaining = entries.len(), ?policy, "controller shutting down");

        let mut completions: Vec<Completion> = match &self.deferred {
            Some(queue) => queue.take().into_iter().map(Completion::Call).collect(),
            None => Vec::new(),
        };
        for (id, mut entry) in entries {
            self.shared.release(id);
            entry.animation.cancel(false);
            if policy == TeardownPolicy::NotifyCancelled {
                completions.push(Completion::Event {
                    event: AnimationEvent {
                        id,
                        outcome: Outcome::Cancelled,
                        values: ValueList::from_slice(entry.animation.values()),
                    },
                    callback: entry.callback,
                });
            }
        }
        completions
    }
}
