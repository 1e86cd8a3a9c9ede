//! Single-axis motion physics for the simulated drives.
//!
//! Positions and velocities are kept in device counts as `f64` so the
//! integration does not accumulate rounding; the bus reports them rounded.

use tracing::trace;

/// Kinematic state of one simulated axis.
#[derive(Debug, Clone, Default)]
pub struct AxisPhysics {
    /// [counts]
    pub position: f64,
    /// [counts/s]
    pub velocity: f64,
}

/// Limits used for one integration step.
#[derive(Debug, Clone, Copy)]
pub struct MotionLimits {
    /// [counts/s]
    pub max_velocity: f64,
    /// [counts/s²]
    pub acceleration: f64,
    /// [counts/s²]
    pub deceleration: f64,
}

impl AxisPhysics {
    /// Drive toward `target` with a trapezoidal profile.
    ///
    /// Snaps onto the target once the remaining distance fits in one step.
    pub fn step_position(&mut self, target: f64, limits: MotionLimits, dt: f64) {
        let error = target - self.position;
        let max_vel = limits.max_velocity.max(1.0);
        let decel = limits.deceleration.max(1.0);

        if error.abs() <= (self.velocity.abs() * dt).max(0.5) && self.velocity.abs() <= decel * dt {
            self.position = target;
            self.velocity = 0.0;
            return;
        }

        let stopping_distance = self.velocity * self.velocity / (2.0 * decel);
        let desired = if error.abs() <= stopping_distance {
            error.signum() * (2.0 * decel * error.abs()).sqrt().min(max_vel)
        } else {
            error.signum() * max_vel
        };
        self.approach_velocity(desired, limits, dt);

        // Never overshoot the target within one step.
        let next = self.position + self.velocity * dt;
        if (target - self.position).signum() != (target - next).signum() {
            self.position = target;
            self.velocity = 0.0;
        } else {
            self.position = next;
        }

        trace!(
            "sim axis: pos={:.1} vel={:.1} target={:.1}",
            self.position, self.velocity, target
        );
    }

    /// Ramp toward a commanded velocity and integrate.
    pub fn step_velocity(&mut self, commanded: f64, limits: MotionLimits, dt: f64) {
        let desired = commanded.clamp(-limits.max_velocity, limits.max_velocity);
        self.approach_velocity(desired, limits, dt);
        self.position += self.velocity * dt;
    }

    /// Power stage off: the axis coasts to rest within one step.
    pub fn halt(&mut self) {
        self.velocity = 0.0;
    }

    fn approach_velocity(&mut self, desired: f64, limits: MotionLimits, dt: f64) {
        let speeding_up = self.velocity == 0.0
            || (desired.abs() > self.velocity.abs() && desired.signum() == self.velocity.signum());
        let rate = if speeding_up {
            limits.acceleration
        } else {
            limits.deceleration
        };
        let max_change = rate.max(1.0) * dt;
        self.velocity += (desired - self.velocity).clamp(-max_change, max_change);
    }
}
