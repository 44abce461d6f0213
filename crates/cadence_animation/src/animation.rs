//! Multi-value animations
//!
//! An [`Animation`] advances a fixed number of [`AnimatedValue`]s together and
//! reports them as one `[f32; N]` per tick. Anything a controller can schedule
//! implements [`AnimationType`], which is also how chains hold their members.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::easing::Curve;
use crate::error::{ensure_finite, AnimationError, Result};
use crate::spring::{Spring, SpringConfig};
use crate::values::{AnimatedValue, EaseIn, Linear, Parametric};

/// Identifier of a scheduled animation
///
/// Controllers hand out ids starting at 1; [`AnimationId::default`] (0) is what
/// callbacks see on an animation that was never registered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(u64);

impl AnimationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for AnimationId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a single tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
    Running,
    Finished,
}

impl TickStatus {
    pub fn is_finished(self) -> bool {
        self == TickStatus::Finished
    }
}

/// Something that can be advanced tick by tick
///
/// Implemented by [`Animation`], [`Chain`](crate::Chain) and
/// [`Sequence`](crate::Sequence); controllers store `Box<dyn AnimationType>`.
pub trait AnimationType: Send {
    fn id(&self) -> Option<AnimationId>;

    /// Called by a controller when the animation is registered
    fn assign_id(&mut self, id: AnimationId);

    /// Advance by `delta` seconds
    fn tick(&mut self, delta: f32) -> Result<TickStatus>;

    fn is_finished(&self) -> bool;

    /// Current output, one entry per animated value
    fn values(&self) -> &[f32];

    /// Rewind to the state before the first tick
    fn reset(&mut self);

    /// Stop without firing completion callbacks
    fn cancel(&mut self, move_to_end: bool);

    /// Retarget value `index`; false when unsupported or out of range
    fn update_target(&mut self, index: usize, target: f32) -> bool;

    /// Push update and completion callbacks onto `queue` instead of calling
    /// them from inside `tick`
    fn defer_callbacks(&mut self, _queue: CallbackQueue) {}
}

impl<T: AnimationType + ?Sized> AnimationType for Box<T> {
    fn id(&self) -> Option<AnimationId> {
        (**self).id()
    }

    fn assign_id(&mut self, id: AnimationId) {
        (**self).assign_id(id)
    }

    fn tick(&mut self, delta: f32) -> Result<TickStatus> {
        (**self).tick(delta)
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn values(&self) -> &[f32] {
        (**self).values()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn cancel(&mut self, move_to_end: bool) {
        (**self).cancel(move_to_end)
    }

    fn update_target(&mut self, index: usize, target: f32) -> bool {
        (**self).update_target(index, target)
    }

    fn defer_callbacks(&mut self, queue: CallbackQueue) {
        (**self).defer_callbacks(queue)
    }
}

/// A callback postponed until the owning thread runs it
pub type DeferredCall = Box<dyn FnOnce() + Send>;

/// Callbacks collected while ticking, to be run later elsewhere
///
/// Clones share the same queue. Calls come out in the order they were pushed.
#[derive(Clone, Default)]
pub struct CallbackQueue {
    calls: Arc<Mutex<Vec<DeferredCall>>>,
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&self, call: F)
    where
        F: FnOnce() + Send + 'static,
    {
        lock(&self.calls).push(Box::new(call));
    }

    pub fn len(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn take(&self) -> Vec<DeferredCall> {
        std::mem::take(&mut *lock(&self.calls))
    }
}

impl fmt::Debug for CallbackQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackQueue")
            .field("pending", &self.len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) type CompleteFn = Box<dyn FnOnce(AnimationId) + Send>;
type UpdateFn<const N: usize> = Box<dyn FnMut(AnimationId, &[f32; N]) + Send>;

/// Per-tick update callback, callable in place or from a deferred call
pub(crate) struct UpdateHook<const N: usize> {
    f: Arc<Mutex<UpdateFn<N>>>,
}

impl<const N: usize> UpdateHook<N> {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: FnMut(AnimationId, &[f32; N]) + Send + 'static,
    {
        Self {
            f: Arc::new(Mutex::new(Box::new(f))),
        }
    }

    pub(crate) fn call(&self, id: AnimationId, values: [f32; N], queue: Option<&CallbackQueue>) {
        match queue {
            None => {
                let mut f = lock(&self.f);
                (&mut **f)(id, &values);
            }
            Some(queue) => {
                let f = Arc::clone(&self.f);
                queue.push(move || {
                    let mut f = lock(&f);
                    (&mut **f)(id, &values);
                });
            }
        }
    }
}

/// Run a completion callback now, or queue it
pub(crate) fn complete(f: CompleteFn, id: AnimationId, queue: Option<&CallbackQueue>) {
    match queue {
        None => f(id),
        Some(queue) => queue.push(move || f(id)),
    }
}

/// `N` animated values advanced in lockstep
///
/// ```ignore
/// let fade = Animation::linear([0.0, 0.0], [1.0, 200.0], 0.3)?
///     .with_delay(0.1)?
///     .on_complete(|id| tracing::info!(%id, "fade done"));
/// ```
pub struct Animation<const N: usize> {
    id: Option<AnimationId>,
    values: [AnimatedValue; N],
    current: [f32; N],
    elapsed: f32,
    delay: f32,
    finished: bool,
    on_update: Option<UpdateHook<N>>,
    on_complete: Option<CompleteFn>,
    deferred: Option<CallbackQueue>,
}

impl<const N: usize> Animation<N> {
    pub fn new(values: [AnimatedValue; N]) -> Result<Self> {
        if N == 0 {
            return Err(AnimationError::config(
                "an animation needs at least one value",
            ));
        }
        let current = std::array::from_fn(|i| values[i].value());
        Ok(Self {
            id: None,
            values,
            current,
            elapsed: 0.0,
            delay: 0.0,
            finished: false,
            on_update: None,
            on_complete: None,
            deferred: None,
        })
    }

    /// Linear interpolation of every value from `from` to `to`
    pub fn linear(from: [f32; N], to: [f32; N], duration: f32) -> Result<Self> {
        Self::new(build(|i| Ok(Linear::new(from[i], to[i], duration)?.into()))?)
    }

    /// Eased interpolation, every value shaped by the same curve
    pub fn parametric(
        from: [f32; N],
        to: [f32; N],
        duration: f32,
        curve: impl Into<Curve>,
    ) -> Result<Self> {
        let curve = curve.into();
        Self::new(build(|i| {
            Ok(Parametric::new(from[i], to[i], duration, curve.clone())?.into())
        })?)
    }

    /// Exponential approach toward `to`
    pub fn ease_in(from: [f32; N], to: [f32; N], tolerance: f32, rate: f32) -> Result<Self> {
        Self::new(build(|i| {
            Ok(EaseIn::new(from[i], to[i], tolerance, rate)?.into())
        })?)
    }

    /// One spring per value, all sharing `config`
    pub fn spring(
        config: SpringConfig,
        from: [f32; N],
        to: [f32; N],
        tolerance: f32,
    ) -> Result<Self> {
        Self::new(build(|i| {
            Ok(Spring::new(config, from[i], to[i], tolerance)?.into())
        })?)
    }

    pub fn with_id(mut self, id: AnimationId) -> Self {
        self.id = Some(id);
        self
    }

    /// Hold the start values for `seconds` before running
    pub fn with_delay(mut self, seconds: f32) -> Result<Self> {
        self.delay = ensure_finite("delay", seconds)?.max(0.0);
        Ok(self)
    }

    /// Called after every tick that advanced the values
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut(AnimationId, &[f32; N]) + Send + 'static,
    {
        self.on_update = Some(UpdateHook::new(f));
        self
    }

    /// Called once, on the tick where every value has finished
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(AnimationId) + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn current(&self) -> [f32; N] {
        self.current
    }

    pub fn value(&self, index: usize) -> Option<f32> {
        self.current.get(index).copied()
    }

    pub fn animated(&self, index: usize) -> Option<&AnimatedValue> {
        self.values.get(index)
    }

    /// Seconds ticked so far, delay included
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    fn refresh(&mut self) {
        for (slot, value) in self.current.iter_mut().zip(&self.values) {
            *slot = value.value();
        }
    }

    fn notify_update(&self) {
        if let Some(on_update) = &self.on_update {
            on_update.call(self.id.unwrap_or_default(), self.current, self.deferred.as_ref());
        }
    }
}

/// Collect `N` values from a fallible constructor
fn build<const N: usize>(
    mut make: impl FnMut(usize) -> Result<AnimatedValue>,
) -> Result<[AnimatedValue; N]> {
    let mut out = Vec::with_capacity(N);
    for i in 0..N {
        out.push(make(i)?);
    }
    out.try_into()
        .map_err(|_| AnimationError::config("value count mismatch"))
}

impl<const N: usize> AnimationType for Animation<N> {
    fn id(&self) -> Option<AnimationId> {
        self.id
    }

    fn assign_id(&mut self, id: AnimationId) {
        self.id = Some(id);
    }

    fn tick(&mut self, delta: f32) -> Result<TickStatus> {
        if self.finished {
            return Ok(TickStatus::Finished);
        }
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.elapsed += delta;

        let active = self.elapsed - self.delay;
        if self.delay > 0.0 && active <= 0.0 {
            return Ok(TickStatus::Running);
        }
        // time spent in the delay does not count toward the values
        let step = delta.min(active);

        for (i, (slot, value)) in self.current.iter_mut().zip(&mut self.values).enumerate() {
            *slot = value.advance(active, step).map_err(|e| e.at_index(i))?;
        }
        self.finished = self.values.iter().all(AnimatedValue::is_finished);

        self.notify_update();
        if !self.finished {
            return Ok(TickStatus::Running);
        }
        if let Some(on_complete) = self.on_complete.take() {
            complete(on_complete, self.id.unwrap_or_default(), self.deferred.as_ref());
        }
        Ok(TickStatus::Finished)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn values(&self) -> &[f32] {
        &self.current
    }

    /// The completion callback is not restored; it fires at most once per animation
    fn reset(&mut self) {
        for value in &mut self.values {
            value.reset();
        }
        self.elapsed = 0.0;
        self.finished = false;
        self.refresh();
    }

    /// With `move_to_end` a running animation reports its end values through
    /// one last update; the completion callback never fires
    fn cancel(&mut self, move_to_end: bool) {
        let was_running = !self.finished;
        for value in &mut self.values {
            value.cancel(move_to_end);
        }
        self.finished = true;
        self.refresh();
        if move_to_end && was_running {
            self.notify_update();
        }
    }

    fn update_target(&mut self, index: usize, target: f32) -> bool {
        self.values
            .get_mut(index)
            .is_some_and(|value| value.update_target(target))
    }

    fn defer_callbacks(&mut self, queue: CallbackQueue) {
        self.deferred = Some(queue);
    }
}

impl<const N: usize> fmt::Debug for Animation<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("id", &self.id)
            .field("current", &self.current)
            .field("elapsed", &self.elapsed)
            .field("delay", &self.delay)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use crate::values::{Constant, SmoothedValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            Animation::<0>::new([]),
            Err(AnimationError::Configuration(_))
        ));
    }

    #[test]
    fn test_values_before_first_tick_are_start_values() {
        let anim = Animation::linear([1.0, 2.0, 3.0], [4.0, 5.0, 6.0], 1.0).unwrap();
        assert_eq!(anim.current(), [1.0, 2.0, 3.0]);
        assert_eq!(anim.values(), &[1.0, 2.0, 3.0]);
        assert!(!anim.is_finished());
    }

    #[test]
    fn test_linear_ticks() {
        let mut anim = Animation::linear([0.0, 10.0], [1.0, 0.0], 1.0).unwrap();
        assert_eq!(anim.tick(0.25).unwrap(), TickStatus::Running);
        assert_eq!(anim.current(), [0.25, 7.5]);
        anim.tick(0.25).unwrap();
        anim.tick(0.25).unwrap();
        assert_eq!(anim.tick(0.25).unwrap(), TickStatus::Finished);
        assert_eq!(anim.current(), [1.0, 0.0]);
    }

    #[test]
    fn test_completion_fires_once_on_last_value() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);

        let mut anim = Animation::new([
            Linear::new(0.0, 1.0, 0.5).unwrap().into(),
            Linear::new(0.0, 1.0, 1.0).unwrap().into(),
        ])
        .unwrap()
        .with_id(AnimationId::new(7))
        .on_complete(move |id| {
            assert_eq!(id, AnimationId::new(7));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..3 {
            assert_eq!(anim.tick(0.25).unwrap(), TickStatus::Running);
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(anim.tick(0.25).unwrap(), TickStatus::Finished);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        anim.tick(0.25).unwrap();
        anim.tick(0.25).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_update_callback_sees_values() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut anim = Animation::linear([0.0], [2.0], 1.0)
            .unwrap()
            .on_update(move |_, values| sink.lock().unwrap().push(values[0]));

        anim.tick(0.5).unwrap();
        anim.tick(0.5).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_delay_holds_start_values() {
        let mut anim = Animation::linear([0.0], [1.0], 1.0)
            .unwrap()
            .with_delay(0.5)
            .unwrap();
        anim.tick(0.25).unwrap();
        assert_eq!(anim.current(), [0.0]);
        anim.tick(0.5).unwrap();
        assert_eq!(anim.current(), [0.25]);
        assert_eq!(anim.elapsed(), 0.75);
    }

    #[test]
    fn test_parametric_factory_uses_curve() {
        let mut anim =
            Animation::parametric([0.0, 0.0], [1.0, 2.0], 1.0, Easing::EaseInQuad).unwrap();
        anim.tick(0.5).unwrap();
        assert_eq!(anim.current(), [0.25, 0.5]);
    }

    #[test]
    fn test_non_finite_reports_index() {
        let mut anim = Animation::new([
            Constant::new(1.0).unwrap().into(),
            Parametric::new(0.0, 1.0, 1.0, Curve::custom(|_| f32::NAN))
                .unwrap()
                .into(),
        ])
        .unwrap();
        let err = anim.tick(0.1).unwrap_err();
        assert!(matches!(err, AnimationError::NonFinite { index: 1, .. }));
    }

    #[test]
    fn test_update_target() {
        let mut anim = Animation::new([
            Linear::new(0.0, 1.0, 1.0).unwrap().into(),
            SmoothedValue::new(0.0, 1.0, 0.01, 0.1, 0.1).unwrap().into(),
        ])
        .unwrap();
        assert!(!anim.update_target(0, 3.0));
        assert!(anim.update_target(1, 3.0));
        assert!(!anim.update_target(2, 3.0));
        assert_eq!(anim.animated(1).map(AnimatedValue::end_value), Some(3.0));
    }

    #[test]
    fn test_cancel_and_reset() {
        let mut anim = Animation::linear([0.0], [4.0], 1.0).unwrap();
        anim.tick(0.5).unwrap();
        anim.cancel(true);
        assert!(anim.is_finished());
        assert_eq!(anim.current(), [4.0]);
        assert_eq!(anim.tick(0.1).unwrap(), TickStatus::Finished);

        anim.reset();
        assert!(!anim.is_finished());
        assert_eq!(anim.current(), [0.0]);
        assert_eq!(anim.elapsed(), 0.0);
    }

    #[test]
    fn test_cancel_to_end_sends_final_update() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let completed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&completed);
        let mut anim = Animation::linear([0.0, 0.0], [1.0, 8.0], 1.0)
            .unwrap()
            .on_update(move |_, values| sink.lock().unwrap().push(*values))
            .on_complete(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        anim.tick(0.25).unwrap();
        anim.cancel(true);
        assert_eq!(*seen.lock().unwrap(), vec![[0.25, 2.0], [1.0, 8.0]]);
        assert_eq!(completed.load(Ordering::SeqCst), 0);

        // already finished: nothing more is reported
        anim.cancel(true);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_cancel_in_place_is_silent() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let mut anim = Animation::linear([0.0], [1.0], 1.0)
            .unwrap()
            .on_update(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        anim.tick(0.5).unwrap();
        anim.cancel(false);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(anim.current(), [0.5]);
    }

    #[test]
    fn test_deferred_callbacks_wait_in_queue() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let updates = Arc::clone(&seen);
        let completions = Arc::clone(&seen);
        let mut anim = Animation::linear([0.0], [1.0], 0.5)
            .unwrap()
            .with_id(AnimationId::new(4))
            .on_update(move |_, values| updates.lock().unwrap().push(format!("update {}", values[0])))
            .on_complete(move |id| completions.lock().unwrap().push(format!("complete {id}")));

        let queue = CallbackQueue::new();
        anim.defer_callbacks(queue.clone());
        anim.tick(0.25).unwrap();
        anim.tick(0.25).unwrap();
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(queue.len(), 3);

        for call in queue.take() {
            call();
        }
        assert!(queue.is_empty());
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["update 0.5", "update 1", "complete 4"]
        );
    }

    #[test]
    fn test_spring_factory_converges() {
        let mut anim =
            Animation::spring(SpringConfig::snappy(), [0.0, 5.0], [1.0, -5.0], 0.001).unwrap();
        let mut status = TickStatus::Running;
        for _ in 0..300 {
            status = anim.tick(1.0 / 60.0).unwrap();
            if status.is_finished() {
                break;
            }
        }
        assert!(status.is_finished());
        assert_eq!(anim.current(), [1.0, -5.0]);
    }
}
