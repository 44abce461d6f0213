//! Animator facade
//!
//! An [`Animator`] owns exactly one controller and is the usual entry point
//! for adding and cancelling animations. Dropping it tears the controller
//! down according to its [`TeardownPolicy`].

use crate::animation::{AnimationId, AnimationType};
use crate::config::TeardownPolicy;
use crate::controller::{Callback, Controller, ControllerHandle, ValueList};
use crate::error::Result;

pub struct Animator<C: Controller> {
    controller: C,
    handle: ControllerHandle,
    teardown: TeardownPolicy,
}

impl<C: Controller> Animator<C> {
    pub fn new(controller: C) -> Self {
        let handle = controller.handle();
        let teardown = controller.config().teardown;
        Self {
            controller,
            handle,
            teardown,
        }
    }

    /// Register an animation and make sure the controller is ticking
    ///
    /// `callback` receives the animation's final [`AnimationEvent`](crate::AnimationEvent).
    pub fn add<A>(
        &mut self,
        animation: A,
        id: Option<AnimationId>,
        callback: Option<Callback>,
    ) -> Result<AnimationId>
    where
        A: AnimationType + 'static,
    {
        let id = self.handle.add(animation, id, callback)?;
        self.controller.wake();
        Ok(id)
    }

    /// Cancel without calling the animation's callback
    ///
    /// With `move_to_end` the animation's values jump to their end and are
    /// reported through one last update. False for unknown ids and for ids
    /// already being cancelled.
    pub fn cancel(&self, id: AnimationId, move_to_end: bool) -> bool {
        self.handle.cancel(id, move_to_end)
    }

    pub fn cancel_all(&self, move_to_end: bool) {
        self.handle.cancel_all(move_to_end);
    }

    pub fn is_running(&self, id: AnimationId) -> bool {
        self.handle.is_running(id)
    }

    pub fn update_target(&self, id: AnimationId, index: usize, target: f32) -> bool {
        self.handle.update_target(id, index, target)
    }

    pub fn values(&self, id: AnimationId) -> Option<ValueList> {
        self.handle.values(id)
    }

    /// Measured ticks per second
    pub fn frame_rate(&self) -> f32 {
        self.controller.frame_rate()
    }

    /// Change the requested tick rate
    pub fn set_frame_rate(&mut self, frame_rate: u32) -> Result<()> {
        self.controller.set_frame_rate(frame_rate)
    }

    /// Resume pulsing after work was added through a [`ControllerHandle`]
    pub fn wake(&mut self) {
        self.controller.wake();
    }

    pub fn len(&self) -> usize {
        self.handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    pub fn teardown(&self) -> TeardownPolicy {
        self.teardown
    }

    pub fn set_teardown(&mut self, policy: TeardownPolicy) {
        self.teardown = policy;
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }
}

impl<C: Controller> Drop for Animator<C> {
    fn drop(&mut self) {
        self.controller.shutdown(self.teardown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Animation;
    use crate::config::ControllerConfig;
    use crate::controller::{
        AnimationEvent, ManualClock, ManualDriver, Outcome, PeriodicDriver, TimeController,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type TestAnimator = Animator<TimeController<ManualDriver, ManualClock>>;

    fn animator(config: ControllerConfig) -> (TestAnimator, ManualClock) {
        let clock = ManualClock::new();
        let controller = TimeController::new(ManualDriver::new(), clock.clone(), config).unwrap();
        (Animator::new(controller), clock)
    }

    fn tick(animator: &mut TestAnimator, clock: &ManualClock, ms: u64) {
        clock.advance(Duration::from_millis(ms));
        animator.controller_mut().timer_callback();
    }

    fn collect() -> (Arc<Mutex<Vec<AnimationEvent>>>, Callback) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        (
            events,
            Box::new(move |event: AnimationEvent| sink.lock().unwrap().push(event)),
        )
    }

    #[test]
    fn test_add_starts_driver_and_completes() {
        let (mut animator, clock) = animator(ControllerConfig::default());
        let (events, callback) = collect();
        let id = animator
            .add(
                Animation::linear([0.0, 10.0], [1.0, 0.0], 0.5).unwrap(),
                None,
                Some(callback),
            )
            .unwrap();
        assert!(animator.controller().driver().is_running());
        assert!(animator.is_running(id));

        tick(&mut animator, &clock, 250);
        assert_eq!(animator.values(id).unwrap().as_slice(), &[0.5, 5.0]);
        tick(&mut animator, &clock, 250);

        assert!(!animator.is_running(id));
        assert!(animator.is_empty());
        assert!(!animator.controller().driver().is_running());
        assert_eq!(events.lock().unwrap()[0].outcome, Outcome::Finished);
    }

    #[test]
    fn test_cancel_unknown_and_known() {
        let (mut animator, clock) = animator(ControllerConfig::default());
        let (events, callback) = collect();
        let id = animator
            .add(Animation::linear([0.0], [1.0], 1.0).unwrap(), None, Some(callback))
            .unwrap();
        assert!(!animator.cancel(AnimationId::new(12345), false));
        assert!(animator.cancel(id, false));
        assert!(!animator.cancel(id, false));

        tick(&mut animator, &clock, 16);
        assert!(!animator.is_running(id));
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_to_end() {
        let (mut animator, clock) = animator(ControllerConfig::default());
        let last = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&last);
        let id = animator
            .add(
                Animation::linear([0.0], [3.0], 1.0)
                    .unwrap()
                    .on_update(move |_, values| *sink.lock().unwrap() = Some(values[0])),
                None,
                None,
            )
            .unwrap();
        tick(&mut animator, &clock, 500);
        assert_eq!(*last.lock().unwrap(), Some(1.5));

        animator.cancel_all(true);
        tick(&mut animator, &clock, 16);
        assert_eq!(*last.lock().unwrap(), Some(3.0));
        assert!(!animator.is_running(id));
        assert!(!animator.controller().driver().is_running());
    }

    #[test]
    fn test_handle_add_then_wake() {
        let (mut animator, clock) = animator(ControllerConfig::default());
        animator
            .add(Animation::linear([0.0], [1.0], 0.1).unwrap(), None, None)
            .unwrap();
        tick(&mut animator, &clock, 100);
        assert!(!animator.controller().driver().is_running());

        let id = animator
            .handle()
            .add(Animation::linear([0.0], [1.0], 0.1).unwrap(), None, None)
            .unwrap();
        assert!(animator.controller().needs_wake());
        animator.wake();
        assert!(animator.controller().driver().is_running());
        tick(&mut animator, &clock, 100);
        assert!(!animator.is_running(id));
    }

    #[test]
    fn test_set_frame_rate_validates() {
        let (mut animator, _clock) = animator(ControllerConfig::default());
        animator.set_frame_rate(30).unwrap();
        assert_eq!(animator.controller().config().frame_rate, 30);
        assert!(animator.set_frame_rate(0).is_err());
    }

    #[test]
    fn test_duplicate_explicit_id() {
        let (mut animator, _clock) = animator(ControllerConfig::default());
        let id = AnimationId::new(3);
        animator
            .add(Animation::linear([0.0], [1.0], 1.0).unwrap(), Some(id), None)
            .unwrap();
        assert!(animator
            .add(Animation::linear([0.0], [1.0], 1.0).unwrap(), Some(id), None)
            .is_err());
        assert_eq!(animator.len(), 1);
    }

    #[test]
    fn test_drop_is_silent_by_default() {
        let (mut animator, _clock) = animator(ControllerConfig::default());
        let (events, callback) = collect();
        animator
            .add(Animation::linear([0.0], [1.0], 1.0).unwrap(), None, Some(callback))
            .unwrap();
        drop(animator);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_can_notify() {
        let (mut animator, _clock) = animator(
            ControllerConfig::default().teardown(TeardownPolicy::NotifyCancelled),
        );
        let (events, callback) = collect();
        let id = animator
            .add(Animation::linear([0.0], [1.0], 1.0).unwrap(), None, Some(callback))
            .unwrap();
        let handle = animator.handle();
        drop(animator);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, id);
        assert_eq!(events[0].outcome, Outcome::Cancelled);
        assert!(handle.is_closed());
    }

    #[test]
    fn test_frame_rate_reported() {
        let (mut animator, clock) = animator(ControllerConfig::default());
        animator
            .add(Animation::linear([0.0], [1.0], 10.0).unwrap(), None, None)
            .unwrap();
        for _ in 0..24 {
            tick(&mut animator, &clock, 10);
        }
        assert!((animator.frame_rate() - 100.0).abs() < 1.0);
    }
}
