//! Background controller demo
//!
//! Runs animations on the worker thread while the main thread waits on a
//! channel; completion callbacks are delivered back to the main thread.
//!
//! Run with: cargo run -p cadence_animation --example background

use std::sync::mpsc;
use std::time::Duration;

use cadence_animation::{
    Animation, AnimationEvent, Animator, AsyncController, CallbackContext, ControllerConfig,
    Easing, Outcome, Result, Sequence, SmoothedValue, TeardownPolicy,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let (wake_tx, wake_rx) = mpsc::channel();
    let config = ControllerConfig::new()
        .frame_rate(120)
        .callback_context(CallbackContext::Owner)
        .teardown(TeardownPolicy::NotifyCancelled);
    let controller = AsyncController::spawn_with_wake(config, move || {
        let _ = wake_tx.send(());
    })?;
    let mut animator = Animator::new(controller);

    let pulse = Sequence::new(vec![
        Animation::parametric([1.0], [1.2], 0.15, Easing::EaseOutQuad)?,
        Animation::parametric([1.2], [1.0], 0.15, Easing::EaseInQuad)?,
    ])?
    .on_update(|id, [scale]| tracing::debug!(%id, scale, "pulse"));

    let follower = Animation::new([SmoothedValue::new(0.0, 10.0, 0.01, 0.02, 0.05)?.into()])?;

    let report = |event: AnimationEvent| match event.outcome {
        Outcome::Finished => tracing::info!(id = %event.id, values = ?event.values, "finished"),
        Outcome::Failed(error) => tracing::warn!(id = %event.id, %error, "failed"),
        Outcome::Cancelled => tracing::info!(id = %event.id, "cancelled"),
    };

    animator.add(pulse, None, Some(Box::new(report)))?;
    let follow = animator.add(follower, None, Some(Box::new(report)))?;

    // retarget while it runs; the value trails the new target smoothly
    std::thread::sleep(Duration::from_millis(50));
    animator.update_target(follow, 0, 25.0);

    while !animator.is_empty() {
        if wake_rx.recv_timeout(Duration::from_millis(500)).is_ok() {
            animator.controller().dispatch_pending();
        }
        if let Some(values) = animator.values(follow) {
            tracing::debug!(?values, fps = animator.frame_rate(), "follower");
        }
    }
    animator.controller().dispatch_pending();

    tracing::info!("done");
    Ok(())
}
