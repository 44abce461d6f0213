//! Time-driven demo
//!
//! Pumps a `TimeController` from a plain loop at 60 Hz and logs a chain that
//! slides a value out and springs it back.
//!
//! Run with: cargo run -p cadence_animation --example time_driven

use std::thread;

use cadence_animation::{
    Animation, AnimationEvent, AnimationType, Animator, Chain, ControllerConfig, Easing,
    PeriodicDriver, Result, SpringConfig, TimeController,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = ControllerConfig::default();
    let interval = config.interval();
    let mut animator = Animator::new(TimeController::manual(config)?);

    let slide_out = Animation::parametric([0.0, 1.0], [240.0, 0.2], 0.4, Easing::EaseOutCubic)?
        .on_update(|id, [x, opacity]| tracing::info!(%id, x, opacity, "slide"));
    let spring_back = Animation::spring(SpringConfig::wobbly(), [240.0, 0.2], [0.0, 1.0], 0.01)?;

    let chain = Chain::new(vec![
        Box::new(slide_out) as Box<dyn AnimationType>,
        Box::new(spring_back),
    ])?;

    let id = animator.add(
        chain,
        None,
        Some(Box::new(|event: AnimationEvent| {
            tracing::info!(id = %event.id, outcome = ?event.outcome, values = ?event.values, "chain done");
        })),
    )?;

    while animator.controller().driver().is_running() {
        thread::sleep(interval);
        animator.controller_mut().timer_callback();
        if let Some(values) = animator.values(id) {
            tracing::debug!(?values, fps = animator.frame_rate(), "tick");
        }
    }

    tracing::info!(fps = animator.frame_rate(), "all animations finished");
    Ok(())
}
