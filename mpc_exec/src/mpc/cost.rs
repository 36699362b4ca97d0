//! Cost evaluation
//!
//! The scalar objective is a weighted sum of three families of terms:
//!
//! 1. Tracking, over every step: cross-track error, heading error and the
//!    deviation from the target cruising speed.
//! 2. Effort, over every actuated step: steering (including the
//!    steering-at-speed coupling term) and acceleration magnitudes.
//! 3. Smoothness, over every pair of consecutive actuated steps: the jump
//!    between consecutive steering and acceleration demands.
//!
//! The solver needs the exact gradient of the objective, which is computed
//! analytically alongside the value.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::problem::Problem;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> Problem<'a> {
    /// Evaluate the scalar objective over the full variable vector.
    pub(crate) fn cost_value(&self, vars: &[f64]) -> f64 {
        let l = &self.layout;
        let n = l.n_steps();
        let w = &self.params.weights;

        let mut cost = 0f64;

        // Errors and relative speed
        for t in 0..n {
            cost += w.cte * vars[l.cte(t)].powi(2);
            cost += w.heading * vars[l.epsi(t)].powi(2);
            cost += w.speed * (vars[l.v(t)] - self.params.ref_speed_ms).powi(2);
        }

        // Actuator effort
        for t in 0..n - 1 {
            cost += w.steer_speed * (vars[l.delta(t)] * vars[l.v(t)]).powi(2);
            cost += w.steer * vars[l.delta(t)].powi(2);
            cost += w.accel * vars[l.a(t)].powi(2);
        }

        // Prefer demands close to the previous step's
        for t in 0..n - 2 {
            cost += w.steer_rate * (vars[l.delta(t + 1)] - vars[l.delta(t)]).powi(2);
            cost += w.accel_rate * (vars[l.a(t + 1)] - vars[l.a(t)]).powi(2);
        }

        cost
    }

    /// Evaluate the gradient of the objective into `grad`.
    ///
    /// `grad` must have the same length as `vars`.
    pub(crate) fn cost_gradient(&self, vars: &[f64], grad: &mut [f64]) {
        let l = &self.layout;
        let n = l.n_steps();
        let w = &self.params.weights;

        for g in grad.iter_mut() {
            *g = 0f64;
        }

        for t in 0..n {
            grad[l.cte(t)] += 2.0 * w.cte * vars[l.cte(t)];
            grad[l.epsi(t)] += 2.0 * w.heading * vars[l.epsi(t)];
            grad[l.v(t)] += 2.0 * w.speed * (vars[l.v(t)] - self.params.ref_speed_ms);
        }

        for t in 0..n - 1 {
            let delta = vars[l.delta(t)];
            let v = vars[l.v(t)];

            // The coupling term contributes to both the steering and the
            // speed entries
            grad[l.delta(t)] += 2.0 * w.steer_speed * delta * v * v;
            grad[l.v(t)] += 2.0 * w.steer_speed * delta * delta * v;

            grad[l.delta(t)] += 2.0 * w.steer * delta;
            grad[l.a(t)] += 2.0 * w.accel * vars[l.a(t)];
        }

        for t in 0..n - 2 {
            let d_delta = vars[l.delta(t + 1)] - vars[l.delta(t)];
            grad[l.delta(t + 1)] += 2.0 * w.steer_rate * d_delta;
            grad[l.delta(t)] -= 2.0 * w.steer_rate * d_delta;

            let d_a = vars[l.a(t + 1)] - vars[l.a(t)];
            grad[l.a(t + 1)] += 2.0 * w.accel_rate * d_a;
            grad[l.a(t)] -= 2.0 * w.accel_rate * d_a;
        }
    }
}
