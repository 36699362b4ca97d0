//! Implementations for the MpcCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;

// Internal
use super::{HorizonLayout, MpcError, Params, Problem, RefPoly};
use crate::nlp;
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// MPC control module state
pub struct MpcCtrl {
    params: Params,

    /// Addressing into the flat optimisation vector, derived from the
    /// horizon length at init
    layout: HorizonLayout,

    report: StatusReport,
}

/// The vehicle state at the start of a control cycle.
///
/// All quantities are expressed in the frame the reference polynomial was
/// fitted in, so `x_m = y_m = psi_rad = 0` is the common case when the path
/// is refitted around the vehicle every cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VehicleState {
    /// Longitudinal position. Units: metres
    pub x_m: f64,

    /// Lateral position. Units: metres
    pub y_m: f64,

    /// Heading. Units: radians
    pub psi_rad: f64,

    /// Forward speed. Units: metres/second
    pub speed_ms: f64,

    /// Cross-track error, the signed lateral offset from the reference
    /// path. Units: metres
    pub cte_m: f64,

    /// Heading error, the offset from the path's tangent direction.
    /// Units: radians
    pub epsi_rad: f64,
}

/// Input data for one control cycle.
pub struct InputData {
    /// The measured vehicle state
    pub state: VehicleState,

    /// The reference path polynomial for this cycle
    pub coeffs: RefPoly,
}

/// Output data from one control cycle: the demand to actuate now, plus the
/// predicted trajectory for display.
#[derive(Debug, Clone, Serialize)]
pub struct OutputData {
    /// Steering demand to apply this cycle.
    ///
    /// Units: radians
    pub steer_rad: f64,

    /// Acceleration demand to apply this cycle, normalised throttle/brake
    /// between -1 and +1.
    pub accel_norm: f64,

    /// Predicted vehicle positions for steps 1 to N-1.
    ///
    /// Units: metres
    pub predicted_m: Vec<[f64; 2]>,
}

/// Status report for MpcCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Objective value at the returned solution
    pub objective: f64,

    /// Outer (constraint) iterations taken by the solver
    pub outer_iterations: usize,

    /// Total inner iterations taken by the solver
    pub inner_iterations: usize,

    /// Wall-clock time of the solve in seconds
    pub solve_time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    /// Build a state from a slice in the order (x, y, psi, v, cte, epsi).
    ///
    /// Slices of any other length are rejected.
    pub fn from_slice(state: &[f64]) -> Result<Self, MpcError> {
        if state.len() != super::NUM_STATES {
            return Err(MpcError::InvalidStateDim(state.len()));
        }

        Ok(VehicleState {
            x_m: state[0],
            y_m: state[1],
            psi_rad: state[2],
            speed_ms: state[3],
            cte_m: state[4],
            epsi_rad: state[5],
        })
    }

    /// The state in the fixed block order (x, y, psi, v, cte, epsi).
    pub fn as_array(&self) -> [f64; super::NUM_STATES] {
        [
            self.x_m,
            self.y_m,
            self.psi_rad,
            self.speed_ms,
            self.cte_m,
            self.epsi_rad,
        ]
    }

    /// True if every quantity is a finite number.
    pub fn is_finite(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite())
    }
}

impl OutputData {
    /// The flat telemetry ordering of the output,
    /// `[steer, accel, x1, y1, x2, y2, ...]`.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(2 + 2 * self.predicted_m.len());
        flat.push(self.steer_rad);
        flat.push(self.accel_norm);

        for point in self.predicted_m.iter() {
            flat.push(point[0]);
            flat.push(point[1]);
        }

        flat
    }
}

impl Default for MpcCtrl {
    fn default() -> Self {
        // The reference defaults are known to satisfy the horizon
        // requirements
        Self::with_params(Params::default())
            .expect("Default MPC parameters must be valid")
    }
}

impl State for MpcCtrl {
    type InitData = &'static str;
    type InitError = MpcError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = MpcError;

    /// Initialise the MpcCtrl module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        let params: Params = params::load(init_data)?;

        *self = Self::with_params(params)?;

        Ok(())
    }

    /// Perform cyclic processing of MPC control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        self.solve(&input_data.state, &input_data.coeffs)
    }
}

impl MpcCtrl {
    /// Build a controller from already constructed parameters.
    ///
    /// The horizon requirements are validated here, before any solve is
    /// attempted.
    pub fn with_params(params: Params) -> Result<Self, MpcError> {
        if !(params.step_duration_s > 0.0) {
            return Err(MpcError::InvalidStepDuration(params.step_duration_s));
        }

        let layout = HorizonLayout::new(params.n_steps)?;

        Ok(MpcCtrl {
            params,
            layout,
            report: StatusReport::default(),
        })
    }

    /// The controller's configuration.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The status report of the most recent solve.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Solve one control cycle.
    ///
    /// Builds the optimisation problem around the measured state and the
    /// reference polynomial, hands it to the solver, and extracts the first
    /// actuator pair plus the predicted positions from the optimal point.
    ///
    /// A solve which does not converge is an error, the demand of a failed
    /// optimisation must never be actuated. The caller decides the fallback.
    pub fn solve(
        &mut self,
        state: &VehicleState,
        coeffs: &RefPoly,
    ) -> Result<(OutputData, StatusReport), MpcError> {
        if !state.is_finite() {
            return Err(MpcError::NumericAnomaly("the input state"));
        }
        if !coeffs.is_finite() {
            return Err(MpcError::NumericAnomaly("the path coefficients"));
        }

        let layout = self.layout;
        let n = layout.n_steps();

        // Initial guess: all zeros apart from the step 0 states, which take
        // the measured values
        let mut guess = vec![0f64; layout.num_variables()];
        for (offset, value) in layout.state_blocks().iter().zip(state.as_array().iter()) {
            guess[*offset] = *value;
        }

        let bounds = self.build_bounds();
        let problem = Problem::new(&self.params, layout, state, coeffs);

        let outcome = nlp::solve(&problem, &bounds, &guess, &self.params.solver)
            .map_err(|e| match e {
                nlp::NlpError::NonFinite(what) => MpcError::NumericAnomaly(what),
                nlp::NlpError::Backend(_) => MpcError::NumericAnomaly("the solver backend"),
            })?;

        match outcome.status {
            nlp::Status::Converged => (),
            status => return Err(MpcError::ConvergenceFailure(status)),
        }

        // First actuator pair is the demand, later positions the prediction
        let solution = &outcome.solution;
        let mut predicted_m = Vec::with_capacity(n - 1);
        for t in 1..n {
            predicted_m.push([solution[layout.x(t)], solution[layout.y(t)]]);
        }

        let output = OutputData {
            steer_rad: solution[layout.delta(0)],
            accel_norm: solution[layout.a(0)],
            predicted_m,
        };

        self.report = StatusReport {
            objective: outcome.objective,
            outer_iterations: outcome.outer_iterations,
            inner_iterations: outcome.inner_iterations,
            solve_time_s: outcome.solve_time_s,
        };

        debug!(
            "MPC solve: objective {:.3}, {} outer / {} inner iterations, {:.1} ms",
            self.report.objective,
            self.report.outer_iterations,
            self.report.inner_iterations,
            self.report.solve_time_s * 1e3
        );

        Ok((output, self.report))
    }

    /// Variable bounds: state blocks are unconstrained, actuator blocks are
    /// boxed at the configured limits.
    fn build_bounds(&self) -> nlp::Bounds {
        let layout = &self.layout;

        let mut lower = vec![std::f64::NEG_INFINITY; layout.num_variables()];
        let mut upper = vec![std::f64::INFINITY; layout.num_variables()];

        for t in 0..layout.n_steps() - 1 {
            lower[layout.delta(t)] = -self.params.steer_bound_rad;
            upper[layout.delta(t)] = self.params.steer_bound_rad;

            lower[layout.a(t)] = -self.params.accel_bound;
            upper[layout.a(t)] = self.params.accel_bound;
        }

        nlp::Bounds { lower, upper }
    }
}
