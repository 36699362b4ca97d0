//! Simulation harness
//!
//! A local stand-in for the driving simulator link. The plant is the same
//! kinematic bicycle the controller predicts with, and actuation demands
//! take effect only after a configurable number of cycles, reproducing the
//! delay between deciding a demand and it physically reaching the
//! actuators. The harness also derives the error quantities the controller
//! consumes (cross-track and heading error) from the reference polynomial,
//! which upstream of a real simulator would come from the telemetry
//! pipeline.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::collections::VecDeque;

// Internal
use crate::mpc::{RefPoly, VehicleState};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulation harness
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Speed the vehicle starts the run at.
    ///
    /// Units: metres/second
    pub initial_speed_ms: f64,

    /// Number of control cycles to run
    pub num_cycles: usize,

    /// Whole cycles between a demand being issued and it taking effect
    pub actuation_delay_steps: usize,

    /// Reference path polynomial coefficients, ascending powers
    pub path_coeffs: [f64; 4],
}

/// Simulated vehicle plant.
pub struct Sim {
    x_m: f64,
    y_m: f64,
    psi_rad: f64,
    speed_ms: f64,

    poly: RefPoly,

    step_duration_s: f64,
    lf_m: f64,
    steer_bound_rad: f64,
    accel_bound: f64,

    /// Demands issued but not yet in effect, oldest first
    pending: VecDeque<[f64; 2]>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Sim {
    /// Build the plant from harness and controller parameters.
    ///
    /// The vehicle starts at the origin, heading along the x axis. The delay
    /// queue is seeded with zero demands so the first issued demand takes
    /// effect `actuation_delay_steps` cycles after it is issued.
    pub fn new(params: &Params, ctrl_params: &crate::mpc::Params) -> Self {
        let mut pending = VecDeque::with_capacity(params.actuation_delay_steps + 1);
        for _ in 0..params.actuation_delay_steps {
            pending.push_back([0f64; 2]);
        }

        Sim {
            x_m: 0f64,
            y_m: 0f64,
            psi_rad: 0f64,
            speed_ms: params.initial_speed_ms,
            poly: RefPoly::new(params.path_coeffs),
            step_duration_s: ctrl_params.step_duration_s,
            lf_m: ctrl_params.lf_m,
            steer_bound_rad: ctrl_params.steer_bound_rad,
            accel_bound: ctrl_params.accel_bound,
            pending,
        }
    }

    /// The controller's view of the current vehicle state.
    ///
    /// The error quantities come from the reference polynomial at the
    /// vehicle's longitudinal position.
    pub fn vehicle_state(&self) -> VehicleState {
        VehicleState {
            x_m: self.x_m,
            y_m: self.y_m,
            psi_rad: self.psi_rad,
            speed_ms: self.speed_ms,
            cte_m: self.poly.evaluate(self.x_m) - self.y_m,
            epsi_rad: self.psi_rad - self.poly.desired_heading(self.x_m),
        }
    }

    /// Issue a demand and advance the plant by one cycle.
    ///
    /// The demand entering the dynamics this cycle is the one issued
    /// `actuation_delay_steps` cycles ago, saturated at the actuator limits.
    pub fn step(&mut self, steer_rad: f64, accel_norm: f64) {
        self.pending.push_back([steer_rad, accel_norm]);
        let demand = self.pending.pop_front().unwrap_or([0f64; 2]);

        let steer = clamp(&demand[0], &-self.steer_bound_rad, &self.steer_bound_rad);
        let accel = clamp(&demand[1], &-self.accel_bound, &self.accel_bound);

        let dt = self.step_duration_s;
        let v = self.speed_ms;

        self.x_m += v * self.psi_rad.cos() * dt;
        self.y_m += v * self.psi_rad.sin() * dt;
        self.psi_rad -= v / self.lf_m * steer * dt;
        self.speed_ms += accel * dt;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_sim(delay: usize) -> Sim {
        let params = Params {
            initial_speed_ms: 10.0,
            num_cycles: 10,
            actuation_delay_steps: delay,
            path_coeffs: [1.0, 0.5, 0.0, 0.0],
        };

        Sim::new(&params, &crate::mpc::Params::default())
    }

    #[test]
    fn test_demand_applied_after_delay() {
        let mut sim = test_sim(1);

        // The first cycle still runs on the seeded zero demand
        sim.step(0.0, 1.0);
        assert!((sim.vehicle_state().speed_ms - 10.0).abs() < 1e-12);

        // The issued demand lands on the second cycle
        sim.step(0.0, 0.0);
        assert!((sim.vehicle_state().speed_ms - 10.1).abs() < 1e-12);
    }

    #[test]
    fn test_no_delay_applies_immediately() {
        let mut sim = test_sim(0);

        sim.step(0.0, 1.0);
        assert!((sim.vehicle_state().speed_ms - 10.1).abs() < 1e-12);
    }

    #[test]
    fn test_demand_saturation() {
        let mut sim = test_sim(0);

        // A demand over the limit acts like one at the limit
        sim.step(0.0, 5.0);
        assert!((sim.vehicle_state().speed_ms - 10.1).abs() < 1e-12);
    }

    #[test]
    fn test_error_quantities_follow_the_path() {
        let sim = test_sim(0);

        // At the origin the path sits 1 m above the vehicle with slope 0.5
        let state = sim.vehicle_state();
        assert!((state.cte_m - 1.0).abs() < 1e-12);
        assert!((state.epsi_rad + 0.5f64.atan()).abs() < 1e-12);
    }
}
