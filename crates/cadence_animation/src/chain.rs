//! Consecutive animations
//!
//! A [`Chain`] runs its members one after another; exactly one member is
//! active at a time. [`Sequence`] is a chain of same-width [`Animation`]s.

use std::fmt;

use crate::animation::{
    complete, Animation, AnimationId, AnimationType, CallbackQueue, CompleteFn, TickStatus,
    UpdateHook,
};
use crate::error::{AnimationError, Result};

/// Runs members back to back
///
/// When the active member finishes, the next tick first resets the following
/// member and then advances it, so every member starts from its own beginning.
/// Time left over in the tick that finished a member is not carried forward.
pub struct Chain<A: AnimationType = Box<dyn AnimationType>> {
    id: Option<AnimationId>,
    members: Vec<A>,
    active: usize,
    finished: bool,
    on_complete: Option<CompleteFn>,
    deferred: Option<CallbackQueue>,
}

impl<A: AnimationType> Chain<A> {
    pub fn new(members: Vec<A>) -> Result<Self> {
        if members.is_empty() {
            return Err(AnimationError::config("a chain needs at least one member"));
        }
        Ok(Self {
            id: None,
            members,
            active: 0,
            finished: false,
            on_complete: None,
            deferred: None,
        })
    }

    /// Append another member
    pub fn then(mut self, mut member: A) -> Self {
        if let Some(queue) = &self.deferred {
            member.defer_callbacks(queue.clone());
        }
        self.members.push(member);
        self
    }

    pub fn with_id(mut self, id: AnimationId) -> Self {
        self.id = Some(id);
        self
    }

    /// Called once, when the last member finishes
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(AnimationId) + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Index of the member currently running
    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_member(&self) -> &A {
        &self.members[self.active]
    }

    fn last(&self) -> usize {
        self.members.len() - 1
    }
}

impl<A: AnimationType> AnimationType for Chain<A> {
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
        if self.members[self.active].is_finished() && self.active < self.last() {
            self.active += 1;
            self.members[self.active].reset();
        }

        let status = self.members[self.active].tick(delta)?;
        if status.is_finished() && self.active == self.last() {
            self.finished = true;
            if let Some(on_complete) = self.on_complete.take() {
                complete(on_complete, self.id.unwrap_or_default(), self.deferred.as_ref());
            }
            return Ok(TickStatus::Finished);
        }
        Ok(TickStatus::Running)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn values(&self) -> &[f32] {
        self.members[self.active].values()
    }

    fn reset(&mut self) {
        for member in &mut self.members {
            member.reset();
        }
        self.active = 0;
        self.finished = false;
    }

    /// With `move_to_end` the chain jumps to its last member's end values;
    /// otherwise it freezes where it is
    fn cancel(&mut self, move_to_end: bool) {
        if move_to_end {
            self.active = self.last();
        }
        self.members[self.active].cancel(move_to_end);
        self.finished = true;
    }

    fn update_target(&mut self, index: usize, target: f32) -> bool {
        self.members[self.active].update_target(index, target)
    }

    fn defer_callbacks(&mut self, queue: CallbackQueue) {
        for member in &mut self.members {
            member.defer_callbacks(queue.clone());
        }
        self.deferred = Some(queue);
    }
}

impl<A: AnimationType> fmt::Debug for Chain<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("id", &self.id)
            .field("members", &self.members.len())
            .field("active", &self.active)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// A chain of `N`-wide animations reporting `[f32; N]`
pub struct Sequence<const N: usize> {
    chain: Chain<Animation<N>>,
    on_update: Option<UpdateHook<N>>,
    deferred: Option<CallbackQueue>,
}

impl<const N: usize> Sequence<N> {
    pub fn new(members: Vec<Animation<N>>) -> Result<Self> {
        Ok(Self {
            chain: Chain::new(members)?,
            on_update: None,
            deferred: None,
        })
    }

    pub fn then(mut self, member: Animation<N>) -> Self {
        self.chain = self.chain.then(member);
        self
    }

    pub fn with_id(mut self, id: AnimationId) -> Self {
        self.chain = self.chain.with_id(id);
        self
    }

    /// Called after every tick with the active member's values
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut(AnimationId, &[f32; N]) + Send + 'static,
    {
        self.on_update = Some(UpdateHook::new(f));
        self
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(AnimationId) + Send + 'static,
    {
        self.chain = self.chain.on_complete(f);
        self
    }

    pub fn current(&self) -> [f32; N] {
        self.chain.active_member().current()
    }

    pub fn active_index(&self) -> usize {
        self.chain.active_index()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    fn notify_update(&self) {
        if let Some(on_update) = &self.on_update {
            on_update.call(
                self.chain.id().unwrap_or_default(),
                self.current(),
                self.deferred.as_ref(),
            );
        }
    }
}

impl<const N: usize> AnimationType for Sequence<N> {
    fn id(&self) -> Option<AnimationId> {
        self.chain.id()
    }

    fn assign_id(&mut self, id: AnimationId) {
        self.chain.assign_id(id);
    }

    fn tick(&mut self, delta: f32) -> Result<TickStatus> {
        let was_finished = self.chain.is_finished();
        let status = self.chain.tick(delta)?;
        if !was_finished {
            self.notify_update();
        }
        Ok(status)
    }

    fn is_finished(&self) -> bool {
        self.chain.is_finished()
    }

    fn values(&self) -> &[f32] {
        self.chain.values()
    }

    fn reset(&mut self) {
        self.chain.reset();
    }

    fn cancel(&mut self, move_to_end: bool) {
        let was_running = !self.chain.is_finished();
        self.chain.cancel(move_to_end);
        if move_to_end && was_running {
            self.notify_update();
        }
    }

    fn update_target(&mut self, index: usize, target: f32) -> bool {
        self.chain.update_target(index, target)
    }

    fn defer_callbacks(&mut self, queue: CallbackQueue) {
        self.chain.defer_callbacks(queue.clone());
        self.deferred = Some(queue);
    }
}

impl<const N: usize> fmt::Debug for Sequence<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("chain", &self.chain)
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn up_and_down() -> Chain {
        Chain::new(vec![
            Box::new(Animation::linear([0.0], [1.0], 1.0).unwrap()) as Box<dyn AnimationType>,
            Box::new(Animation::linear([1.0], [0.0], 1.0).unwrap()),
        ])
        .unwrap()
    }

    #[test]
    fn test_chain_runs_members_in_order() {
        let mut chain = up_and_down();
        assert_eq!(chain.values(), &[0.0]);

        let expected = [0.25, 0.5, 0.75, 1.0, 0.75, 0.5, 0.25, 0.0];
        for (tick, want) in expected.iter().enumerate() {
            let status = chain.tick(0.25).unwrap();
            assert_eq!(chain.values(), &[*want], "tick {}", tick + 1);
            assert_eq!(status.is_finished(), tick == expected.len() - 1);
        }
        assert_eq!(chain.active_index(), 1);
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(matches!(
            Chain::<Box<dyn AnimationType>>::new(Vec::new()),
            Err(AnimationError::Configuration(_))
        ));
        assert!(Sequence::<2>::new(Vec::new()).is_err());
    }

    #[test]
    fn test_heterogeneous_members() {
        let mut chain = Chain::new(vec![
            Box::new(Animation::linear([0.0], [1.0], 0.5).unwrap()) as Box<dyn AnimationType>,
        ])
        .unwrap()
        .then(Box::new(
            Animation::linear([0.0, 0.0], [2.0, 4.0], 0.5).unwrap(),
        ));

        chain.tick(0.5).unwrap();
        assert_eq!(chain.values().len(), 1);
        chain.tick(0.25).unwrap();
        assert_eq!(chain.values(), &[1.0, 2.0]);
    }

    #[test]
    fn test_chain_completion_fires_once_at_end() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut chain = up_and_down()
            .with_id(AnimationId::new(3))
            .on_complete(move |id| {
                assert_eq!(id, AnimationId::new(3));
                counter.fetch_add(1, Ordering::SeqCst);
            });

        for _ in 0..4 {
            chain.tick(0.25).unwrap();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        for _ in 0..6 {
            chain.tick(0.25).unwrap();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_to_end_jumps_to_last_member() {
        let mut chain = up_and_down();
        chain.tick(0.25).unwrap();
        chain.cancel(true);
        assert!(chain.is_finished());
        assert_eq!(chain.active_index(), 1);
        assert_eq!(chain.values(), &[0.0]);
    }

    #[test]
    fn test_cancel_in_place() {
        let mut chain = up_and_down();
        chain.tick(0.5).unwrap();
        chain.cancel(false);
        assert!(chain.is_finished());
        assert_eq!(chain.values(), &[0.5]);
        assert_eq!(chain.tick(0.25).unwrap(), TickStatus::Finished);
    }

    #[test]
    fn test_reset_rewinds_to_first_member() {
        let mut chain = up_and_down();
        for _ in 0..8 {
            chain.tick(0.25).unwrap();
        }
        chain.reset();
        assert!(!chain.is_finished());
        assert_eq!(chain.active_index(), 0);
        assert_eq!(chain.values(), &[0.0]);
        chain.tick(0.5).unwrap();
        assert_eq!(chain.values(), &[0.5]);
    }

    #[test]
    fn test_sequence_reports_fixed_width() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut seq = Sequence::new(vec![
            Animation::linear([0.0, 0.0], [1.0, 2.0], 0.5).unwrap(),
            Animation::linear([1.0, 2.0], [0.0, 0.0], 0.5).unwrap(),
        ])
        .unwrap()
        .on_update(move |_, values| sink.lock().unwrap().push(*values));

        let mut status = TickStatus::Running;
        while !status.is_finished() {
            status = seq.tick(0.25).unwrap();
        }
        assert_eq!(seq.current(), [0.0, 0.0]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![[0.5, 1.0], [1.0, 2.0], [0.5, 1.0], [0.0, 0.0]]
        );

        // no further updates once finished
        seq.tick(0.25).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_sequence_cancel_to_end_reports_last_values() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut seq = Sequence::new(vec![
            Animation::linear([0.0], [1.0], 1.0).unwrap(),
            Animation::linear([1.0], [5.0], 1.0).unwrap(),
        ])
        .unwrap()
        .on_update(move |_, values| sink.lock().unwrap().push(values[0]));

        seq.tick(0.5).unwrap();
        seq.cancel(true);
        assert_eq!(seq.current(), [5.0]);
        assert_eq!(*seen.lock().unwrap(), vec![0.5, 5.0]);
    }

    #[test]
    fn test_deferred_chain_queues_member_callbacks() {
        let fired = Arc::new(AtomicUsize::new(0));
        let member = Arc::clone(&fired);
        let whole = Arc::clone(&fired);
        let mut chain = Chain::new(vec![Box::new(
            Animation::linear([0.0], [1.0], 0.25)
                .unwrap()
                .on_complete(move |_| {
                    member.fetch_add(1, Ordering::SeqCst);
                }),
        ) as Box<dyn AnimationType>])
        .unwrap()
        .on_complete(move |_| {
            whole.fetch_add(10, Ordering::SeqCst);
        });

        let queue = CallbackQueue::new();
        chain.defer_callbacks(queue.clone());
        assert!(chain.tick(0.25).unwrap().is_finished());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        for call in queue.take() {
            call();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 11);
    }
}
