//! Spring physics
//!
//! A damped spring integrated with RK4 in fixed sub-steps. Supports preset
//! configurations, retargeting mid-flight (velocity is kept), and optional
//! overshoot.

use crate::error::{check_output, ensure_finite, AnimationError, Result};
use crate::values::Convergence;

/// Number of consecutive at-rest advances before a spring reports finished
const DEFAULT_SETTLE_TICKS: u32 = 3;

/// Physical parameters of a spring
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
}

impl SpringConfig {
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass,
        }
    }

    /// A gentle, slow spring
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0, 1.0)
    }

    /// A wobbly spring with visible overshoot
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0, 1.0)
    }

    /// A stiff, quick spring
    pub fn stiff() -> Self {
        Self::new(400.0, 30.0, 1.0)
    }

    /// A very stiff spring with little oscillation
    pub fn snappy() -> Self {
        Self::new(600.0, 40.0, 1.0)
    }

    /// A slow, critically damped spring
    pub fn molasses() -> Self {
        Self::new(100.0, 20.0, 1.0)
    }

    pub fn critical_damping(&self) -> f32 {
        2.0 * (self.stiffness * self.mass).sqrt()
    }

    /// Will oscillate around the target
    pub fn is_underdamped(&self) -> bool {
        self.damping < self.critical_damping()
    }

    pub fn is_critically_damped(&self) -> bool {
        (self.damping - self.critical_damping()).abs() < 0.01
    }

    pub fn is_overdamped(&self) -> bool {
        self.damping > self.critical_damping()
    }

    /// Check that the parameters describe a physical spring
    pub fn validate(&self) -> Result<()> {
        ensure_finite("stiffness", self.stiffness)?;
        ensure_finite("damping", self.damping)?;
        ensure_finite("mass", self.mass)?;
        if self.mass <= 0.0 {
            return Err(AnimationError::config("spring mass must be positive"));
        }
        if self.stiffness <= 0.0 {
            return Err(AnimationError::config("spring stiffness must be positive"));
        }
        if self.damping < 0.0 {
            return Err(AnimationError::config("spring damping must not be negative"));
        }
        Ok(())
    }

    fn acceleration(&self, x: f32, v: f32, target: f32) -> f32 {
        let spring_force = -self.stiffness * (x - target);
        let damping_force = -self.damping * v;
        (spring_force + damping_force) / self.mass
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::stiff()
    }
}

/// A value pulled toward its target by a damped spring
///
/// The spring finishes once both its distance to the target and its speed stay
/// below their tolerances for a few consecutive advances. By default the value
/// is not allowed to cross the target: it lands there and stops.
#[derive(Clone, Debug)]
pub struct Spring {
    config: SpringConfig,
    core: Convergence,
    velocity: f32,
    velocity_tolerance: f32,
    allow_overshoot: bool,
    settle_ticks: u32,
    settled_for: u32,
}

impl Spring {
    pub fn new(config: SpringConfig, start: f32, target: f32, tolerance: f32) -> Result<Self> {
        config.validate()?;
        let core = Convergence::new(start, target, tolerance)?;
        Ok(Self {
            config,
            velocity_tolerance: core.tolerance,
            core,
            velocity: 0.0,
            allow_overshoot: false,
            settle_ticks: DEFAULT_SETTLE_TICKS,
            settled_for: 0,
        })
    }

    /// Let the value swing past the target and oscillate
    pub fn allow_overshoot(mut self, allow: bool) -> Self {
        self.allow_overshoot = allow;
        self
    }

    /// Maximum speed (units per second) still considered at rest
    pub fn with_velocity_tolerance(mut self, tolerance: f32) -> Result<Self> {
        let tolerance = ensure_finite("velocity tolerance", tolerance)?;
        if tolerance <= 0.0 {
            return Err(AnimationError::config("velocity tolerance must be positive"));
        }
        self.velocity_tolerance = tolerance;
        Ok(self)
    }

    /// Consecutive at-rest advances required before finishing
    pub fn with_settle_ticks(mut self, ticks: u32) -> Self {
        self.settle_ticks = ticks.max(1);
        self
    }

    /// Start with an initial velocity
    ///
    /// Unless overshoot is allowed, a velocity pointing away from the target
    /// does not move the value away; it is held until the spring reverses it.
    pub fn with_velocity(mut self, velocity: f32) -> Result<Self> {
        self.velocity = ensure_finite("velocity", velocity)?;
        Ok(self)
    }

    pub fn with_step(mut self, seconds: f32) -> Result<Self> {
        self.core.set_step(seconds)?;
        Ok(self)
    }

    pub fn with_time_cap(mut self, seconds: f32) -> Self {
        self.core.set_time_cap(Some(seconds));
        self
    }

    pub fn config(&self) -> SpringConfig {
        self.config
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn value(&self) -> f32 {
        self.core.current
    }

    pub fn end_value(&self) -> f32 {
        self.core.target
    }

    pub fn is_finished(&self) -> bool {
        self.core.finished
    }

    /// Move the target; the current velocity carries over
    pub fn update_target(&mut self, target: f32) -> bool {
        if self.core.finished {
            return false;
        }
        self.core.target = target;
        self.settled_for = 0;
        true
    }

    pub(crate) fn advance(&mut self, _elapsed: f32, delta: f32) -> Result<f32> {
        let steps = self.core.begin(delta);
        if steps == 0 {
            return Ok(self.core.current);
        }

        let dt = self.core.step();
        for _ in 0..steps {
            self.integrate(dt)?;
        }

        if self.core.time_capped() {
            self.land();
        } else if self.core.within_tolerance() && self.velocity.abs() < self.velocity_tolerance {
            self.settled_for += 1;
            if self.settled_for >= self.settle_ticks {
                self.land();
            }
        } else {
            self.settled_for = 0;
        }
        Ok(self.core.current)
    }

    pub fn cancel(&mut self, move_to_end: bool) {
        self.core.cancel(move_to_end);
        self.velocity = 0.0;
    }

    pub fn reset(&mut self) {
        self.core.reset();
        self.velocity = 0.0;
        self.settled_for = 0;
    }

    fn land(&mut self) {
        self.core.snap();
        self.velocity = 0.0;
    }

    /// One RK4 step of `dt` seconds
    fn integrate(&mut self, dt: f32) -> Result<()> {
        let target = self.core.target;
        let x = self.core.current;
        let v = self.velocity;
        let accel = |x: f32, v: f32| self.config.acceleration(x, v, target);

        let k1_v = accel(x, v);
        let k1_x = v;

        let k2_v = accel(x + k1_x * dt * 0.5, v + k1_v * dt * 0.5);
        let k2_x = v + k1_v * dt * 0.5;

        let k3_v = accel(x + k2_x * dt * 0.5, v + k2_v * dt * 0.5);
        let k3_x = v + k2_v * dt * 0.5;

        let k4_v = accel(x + k3_x * dt, v + k3_v * dt);
        let k4_x = v + k3_v * dt;

        let next_v = check_output(0, v + (k1_v + 2.0 * k2_v + 2.0 * k3_v + k4_v) * dt / 6.0)?;
        let next_x = check_output(0, x + (k1_x + 2.0 * k2_x + 2.0 * k3_x + k4_x) * dt / 6.0)?;

        if self.allow_overshoot {
            self.core.current = next_x;
            self.velocity = next_v;
            return Ok(());
        }

        let before = x - target;
        let after = next_x - target;
        let crossed = before != 0.0 && (after == 0.0 || before.signum() != after.signum());
        if crossed {
            self.core.current = target;
            self.velocity = 0.0;
        } else if after.abs() > before.abs() {
            // moving away: hold position while the spring turns the velocity around
            self.velocity = next_v;
        } else {
            self.core.current = next_x;
            self.velocity = next_v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(spring: &mut Spring, frames: usize) -> f32 {
        let mut peak = f32::MIN;
        for _ in 0..frames {
            peak = peak.max(spring.advance(0.0, 1.0 / 60.0).unwrap());
        }
        peak
    }

    #[test]
    fn test_spring_settles_to_target() {
        let mut spring = Spring::new(SpringConfig::stiff(), 0.0, 100.0, 0.01).unwrap();
        run(&mut spring, 120);

        assert!(spring.is_finished());
        assert_eq!(spring.value(), 100.0);
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn test_spring_inherits_velocity() {
        let mut spring = Spring::new(SpringConfig::wobbly(), 0.0, 100.0, 0.01)
            .unwrap()
            .allow_overshoot(true);
        run(&mut spring, 10);

        let velocity = spring.velocity();
        assert!(velocity > 0.0);

        assert!(spring.update_target(50.0));
        assert_eq!(spring.velocity(), velocity);
        assert_eq!(spring.end_value(), 50.0);
    }

    #[test]
    fn test_spring_presets() {
        assert!(SpringConfig::wobbly().is_underdamped());
        assert!(SpringConfig::gentle().is_underdamped());
        assert!(SpringConfig::stiff().is_underdamped());
        assert!(SpringConfig::molasses().is_critically_damped());
        assert!(SpringConfig::new(100.0, 40.0, 1.0).is_overdamped());
    }

    #[test]
    fn test_overshoot_is_clamped_by_default() {
        let mut clamped = Spring::new(SpringConfig::wobbly(), 0.0, 100.0, 0.01).unwrap();
        assert!(run(&mut clamped, 300) <= 100.0);
        assert!(clamped.is_finished());

        let mut free = Spring::new(SpringConfig::wobbly(), 0.0, 100.0, 0.01)
            .unwrap()
            .allow_overshoot(true);
        assert!(run(&mut free, 600) > 100.0);
        assert!(free.is_finished());
        assert_eq!(free.value(), 100.0);
    }

    #[test]
    fn test_outward_velocity_never_increases_distance() {
        let mut spring = Spring::new(SpringConfig::stiff(), 0.0, 100.0, 0.01)
            .unwrap()
            .with_velocity(-500.0)
            .unwrap();
        let mut distance = 100.0f32;
        for _ in 0..240 {
            let value = spring.advance(0.0, 1.0 / 60.0).unwrap();
            let next = (100.0 - value).abs();
            assert!(next <= distance, "distance grew from {distance} to {next}");
            distance = next;
        }
        assert!(spring.is_finished());
        assert_eq!(spring.value(), 100.0);
    }

    #[test]
    fn test_outward_velocity_moves_away_with_overshoot() {
        let mut spring = Spring::new(SpringConfig::stiff(), 0.0, 100.0, 0.01)
            .unwrap()
            .allow_overshoot(true)
            .with_velocity(-500.0)
            .unwrap();
        assert!(spring.advance(0.0, 1.0 / 60.0).unwrap() < 0.0);
    }

    #[test]
    fn test_spring_large_frames_stay_stable() {
        let mut spring = Spring::new(SpringConfig::stiff(), 0.0, 1000.0, 0.01)
            .unwrap()
            .allow_overshoot(true);
        for _ in 0..100 {
            let value = spring.advance(0.0, 0.1).unwrap();
            assert!(value < 2000.0);
            assert!(value > -500.0);
        }
        assert!(spring.is_finished());
    }

    #[test]
    fn test_spring_different_mass() {
        let config = SpringConfig::new(400.0, 25.0, 2.0);
        let mut spring = Spring::new(config, 0.0, 100.0, 0.01).unwrap();
        run(&mut spring, 240);

        assert!(spring.value().is_finite());
        assert!(spring.is_finished());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(Spring::new(SpringConfig::new(100.0, 10.0, 0.0), 0.0, 1.0, 0.01).is_err());
        assert!(Spring::new(SpringConfig::new(-1.0, 10.0, 1.0), 0.0, 1.0, 0.01).is_err());
        assert!(Spring::new(SpringConfig::new(100.0, -1.0, 1.0), 0.0, 1.0, 0.01).is_err());
        assert!(Spring::new(SpringConfig::new(f32::NAN, 1.0, 1.0), 0.0, 1.0, 0.01).is_err());
        assert!(Spring::new(SpringConfig::stiff(), 0.0, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_finished_spring_rejects_retarget() {
        let mut spring = Spring::new(SpringConfig::snappy(), 0.0, 1.0, 0.01).unwrap();
        run(&mut spring, 120);
        assert!(spring.is_finished());
        assert!(!spring.update_target(2.0));

        spring.reset();
        assert!(!spring.is_finished());
        assert_eq!(spring.value(), 0.0);
        assert!(spring.update_target(2.0));
    }
}
