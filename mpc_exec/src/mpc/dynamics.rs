//! Dynamics constraint evaluation
//!
//! The discretised kinematic bicycle model enters the optimisation problem
//! as one equality constraint per state quantity per step. At step 0 the
//! residual pins the predicted state to the measured one; at every later
//! step the residual is the difference between the state predicted by the
//! model and the corresponding variable, so that a feasible point follows
//! the model exactly.
//!
//! The model equations, from step t-1 to step t:
//!
//! ```text
//! x(t)    = x(t-1) + v(t-1) * cos(psi(t-1)) * dt
//! y(t)    = y(t-1) + v(t-1) * sin(psi(t-1)) * dt
//! psi(t)  = psi(t-1) - v(t-1) / Lf * delta * dt
//! v(t)    = v(t-1) + a * dt
//! cte(t)  = (f(x(t-1)) - y(t-1)) + v(t-1) * sin(epsi(t-1)) * dt
//! epsi(t) = (psi(t-1) - psides(x(t-1))) - v(t-1) / Lf * delta * dt
//! ```
//!
//! where `f` is the reference polynomial and `psides` its tangent
//! direction. The actuator pair `(delta, a)` is not necessarily the one
//! decided at step t-1: to model the delay between deciding a demand and it
//! taking physical effect, the pair is read `latency_steps` steps earlier
//! (saturated at step 0, where no earlier demand exists within the
//! horizon). Shifting this offset changes the compensated latency and must
//! not be done lightly.
//!
//! The solver needs Jacobian-transpose products of the constraint mapping,
//! which are computed analytically from the same equations.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::problem::Problem;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> Problem<'a> {
    /// The actuator step feeding the dynamics between steps t-1 and t.
    ///
    /// Valid for `t >= 1`.
    fn actuator_step(&self, t: usize) -> usize {
        (t - 1).saturating_sub(self.params.latency_steps)
    }

    /// Evaluate the equality constraint residuals into `residuals`.
    ///
    /// `residuals` must have length `6N`. Every entry is zero at a feasible
    /// point.
    pub(crate) fn constraint_values(&self, vars: &[f64], residuals: &mut [f64]) {
        let l = &self.layout;
        let n = l.n_steps();
        let dt = self.params.step_duration_s;
        let lf = self.params.lf_m;

        // Step 0: pin the predicted state to the measured one
        let state = self.state.as_array();
        for (offset, measured) in l.state_blocks().iter().zip(state.iter()) {
            residuals[*offset] = vars[*offset] - measured;
        }

        // Later steps: model prediction minus the step's variables
        for t in 1..n {
            let x0 = vars[l.x(t - 1)];
            let y0 = vars[l.y(t - 1)];
            let psi0 = vars[l.psi(t - 1)];
            let v0 = vars[l.v(t - 1)];
            let epsi0 = vars[l.epsi(t - 1)];

            let k = self.actuator_step(t);
            let delta = vars[l.delta(k)];
            let a = vars[l.a(k)];

            let f0 = self.poly.evaluate(x0);
            let psides0 = self.poly.desired_heading(x0);

            residuals[l.x(t)] = (x0 + v0 * psi0.cos() * dt) - vars[l.x(t)];
            residuals[l.y(t)] = (y0 + v0 * psi0.sin() * dt) - vars[l.y(t)];
            residuals[l.psi(t)] = (psi0 - v0 / lf * delta * dt) - vars[l.psi(t)];
            residuals[l.v(t)] = (v0 + a * dt) - vars[l.v(t)];
            residuals[l.cte(t)] =
                ((f0 - y0) + v0 * epsi0.sin() * dt) - vars[l.cte(t)];
            residuals[l.epsi(t)] =
                ((psi0 - psides0) - v0 / lf * delta * dt) - vars[l.epsi(t)];
        }
    }

    /// Evaluate the Jacobian-transpose product `J(vars)^T * mult` into
    /// `product`.
    ///
    /// `mult` must have length `6N` and `product` the length of `vars`.
    pub(crate) fn constraint_jacobian_product(
        &self,
        vars: &[f64],
        mult: &[f64],
        product: &mut [f64],
    ) {
        let l = &self.layout;
        let n = l.n_steps();
        let dt = self.params.step_duration_s;
        let lf = self.params.lf_m;

        for p in product.iter_mut() {
            *p = 0f64;
        }

        // Step 0 residuals are the identity in the step 0 variables
        for offset in l.state_blocks().iter() {
            product[*offset] += mult[*offset];
        }

        for t in 1..n {
            let x0 = vars[l.x(t - 1)];
            let psi0 = vars[l.psi(t - 1)];
            let v0 = vars[l.v(t - 1)];
            let epsi0 = vars[l.epsi(t - 1)];

            let k = self.actuator_step(t);
            let delta = vars[l.delta(k)];

            let slope0 = self.poly.slope(x0);
            // d/dx atan(slope(x))
            let dpsides0 = self.poly.slope_derivative(x0) / (1.0 + slope0 * slope0);

            // x residual
            let m = mult[l.x(t)];
            product[l.x(t)] -= m;
            product[l.x(t - 1)] += m;
            product[l.v(t - 1)] += m * psi0.cos() * dt;
            product[l.psi(t - 1)] -= m * v0 * psi0.sin() * dt;

            // y residual
            let m = mult[l.y(t)];
            product[l.y(t)] -= m;
            product[l.y(t - 1)] += m;
            product[l.v(t - 1)] += m * psi0.sin() * dt;
            product[l.psi(t - 1)] += m * v0 * psi0.cos() * dt;

            // psi residual
            let m = mult[l.psi(t)];
            product[l.psi(t)] -= m;
            product[l.psi(t - 1)] += m;
            product[l.v(t - 1)] -= m * delta * dt / lf;
            product[l.delta(k)] -= m * v0 * dt / lf;

            // v residual
            let m = mult[l.v(t)];
            product[l.v(t)] -= m;
            product[l.v(t - 1)] += m;
            product[l.a(k)] += m * dt;

            // cte residual
            let m = mult[l.cte(t)];
            product[l.cte(t)] -= m;
            product[l.x(t - 1)] += m * slope0;
            product[l.y(t - 1)] -= m;
            product[l.v(t - 1)] += m * epsi0.sin() * dt;
            product[l.epsi(t - 1)] += m * v0 * epsi0.cos() * dt;

            // epsi residual
            let m = mult[l.epsi(t)];
            product[l.epsi(t)] -= m;
            product[l.psi(t - 1)] += m;
            product[l.x(t - 1)] -= m * dpsides0;
            product[l.v(t - 1)] -= m * delta * dt / lf;
            product[l.delta(k)] -= m * v0 * dt / lf;
        }
    }
}

#[cfg(test)]
mod test {
    use crate::mpc::{HorizonLayout, Params, Problem, RefPoly, VehicleState};

    fn test_params(n_steps: usize, latency_steps: usize) -> Params {
        let mut params = Params::default();
        params.n_steps = n_steps;
        params.latency_steps = latency_steps;
        params
    }

    fn test_state() -> VehicleState {
        VehicleState {
            x_m: 0.0,
            y_m: 0.5,
            psi_rad: 0.1,
            speed_ms: 20.0,
            cte_m: 0.5,
            epsi_rad: -0.05,
        }
    }

    /// Build a variable vector which follows the model exactly, by sweeping
    /// forward through the horizon and absorbing each step's residual into
    /// that step's variables.
    fn feasible_vars(problem: &Problem, layout: &HorizonLayout) -> Vec<f64> {
        let mut vars = vec![0f64; layout.num_variables()];

        // Measured state at step 0 and some non-trivial demands
        for (offset, value) in layout
            .state_blocks()
            .iter()
            .zip(test_state().as_array().iter())
        {
            vars[*offset] = *value;
        }
        for t in 0..layout.n_steps() - 1 {
            vars[layout.delta(t)] = 0.05 * (t as f64 * 0.9).cos();
            vars[layout.a(t)] = 0.3 * (t as f64 * 0.7).sin();
        }

        let mut residuals = vec![0f64; layout.num_constraints()];
        for t in 1..layout.n_steps() {
            problem.constraint_values(&vars, &mut residuals);
            for offset in layout.state_blocks().iter() {
                vars[offset + t] += residuals[offset + t];
            }
        }

        vars
    }

    #[test]
    fn test_feasible_trajectory_has_zero_residuals() {
        let params = test_params(6, 1);
        let layout = HorizonLayout::new(params.n_steps).unwrap();
        let state = test_state();
        let poly = RefPoly::new([0.5, 0.05, 0.002, -0.0001]);
        let problem = Problem::new(&params, layout, &state, &poly);

        let vars = feasible_vars(&problem, &layout);
        let mut residuals = vec![0f64; layout.num_constraints()];
        problem.constraint_values(&vars, &mut residuals);

        for (i, r) in residuals.iter().enumerate() {
            assert!(r.abs() < 1e-9, "residual {} is {}", i, r);
        }
    }

    #[test]
    fn test_pin_residuals_by_construction() {
        let params = test_params(4, 1);
        let layout = HorizonLayout::new(params.n_steps).unwrap();
        let state = test_state();
        let poly = RefPoly::new([0.0; 4]);
        let problem = Problem::new(&params, layout, &state, &poly);

        // Offset every step 0 variable from the measured state by 0.5
        let mut vars = vec![0f64; layout.num_variables()];
        for (offset, value) in layout
            .state_blocks()
            .iter()
            .zip(state.as_array().iter())
        {
            vars[*offset] = value + 0.5;
        }

        let mut residuals = vec![0f64; layout.num_constraints()];
        problem.constraint_values(&vars, &mut residuals);

        for offset in layout.state_blocks().iter() {
            assert!((residuals[*offset] - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_latency_shift_selects_earlier_demand() {
        let n = 4;
        let layout = HorizonLayout::new(n).unwrap();
        let state = test_state();
        let poly = RefPoly::new([0.0; 4]);

        // Two opposing steering demands so the selected index matters
        let mut vars = vec![0f64; layout.num_variables()];
        vars[layout.psi(1)] = 0.2;
        vars[layout.v(1)] = 10.0;
        vars[layout.delta(0)] = 0.3;
        vars[layout.delta(1)] = -0.3;

        let params = test_params(n, 1);
        let dt = params.step_duration_s;
        let lf = params.lf_m;

        // With one step of latency the t = 2 heading comes from delta(0)
        vars[layout.psi(2)] = 0.2 - 10.0 / lf * 0.3 * dt;

        let problem = Problem::new(&params, layout, &state, &poly);
        let mut residuals = vec![0f64; layout.num_constraints()];
        problem.constraint_values(&vars, &mut residuals);
        assert!(residuals[layout.psi(2)].abs() < 1e-12);

        // Without latency compensation the same point violates the t = 2
        // heading constraint, since delta(1) points the other way
        let params_nolat = test_params(n, 0);
        let problem_nolat = Problem::new(&params_nolat, layout, &state, &poly);
        problem_nolat.constraint_values(&vars, &mut residuals);
        assert!(residuals[layout.psi(2)].abs() > 0.1);
    }

    #[test]
    fn test_first_transition_uses_first_demand() {
        let n = 4;
        let layout = HorizonLayout::new(n).unwrap();
        let state = test_state();
        let poly = RefPoly::new([0.0; 4]);

        let mut vars = vec![0f64; layout.num_variables()];
        vars[layout.psi(0)] = state.psi_rad;
        vars[layout.v(0)] = state.speed_ms;
        vars[layout.delta(0)] = 0.2;

        let params = test_params(n, 1);
        let dt = params.step_duration_s;
        let lf = params.lf_m;

        // No demand exists before step 0, so the t = 1 transition still uses
        // delta(0) even with latency compensation on
        vars[layout.psi(1)] = state.psi_rad - state.speed_ms / lf * 0.2 * dt;

        let problem = Problem::new(&params, layout, &state, &poly);
        let mut residuals = vec![0f64; layout.num_constraints()];
        problem.constraint_values(&vars, &mut residuals);
        assert!(residuals[layout.psi(1)].abs() < 1e-12);
    }

    #[test]
    fn test_jacobian_product_matches_finite_differences() {
        let params = test_params(4, 1);
        let layout = HorizonLayout::new(params.n_steps).unwrap();
        let state = test_state();
        let poly = RefPoly::new([0.5, 0.05, 0.002, -0.0001]);
        let problem = Problem::new(&params, layout, &state, &poly);

        let n_vars = layout.num_variables();
        let n_cons = layout.num_constraints();

        let vars: Vec<f64> = (0..n_vars).map(|i| (i as f64 * 0.61).sin() * 0.5).collect();
        let mult: Vec<f64> = (0..n_cons).map(|i| (i as f64 * 0.37).cos()).collect();

        let mut product = vec![0f64; n_vars];
        problem.constraint_jacobian_product(&vars, &mult, &mut product);

        let h = 1e-6;
        let mut res_fwd = vec![0f64; n_cons];
        let mut res_bwd = vec![0f64; n_cons];

        for j in 0..n_vars {
            let mut fwd = vars.clone();
            let mut bwd = vars.clone();
            fwd[j] += h;
            bwd[j] -= h;

            problem.constraint_values(&fwd, &mut res_fwd);
            problem.constraint_values(&bwd, &mut res_bwd);

            let mut fd = 0f64;
            for i in 0..n_cons {
                fd += mult[i] * (res_fwd[i] - res_bwd[i]) / (2.0 * h);
            }

            assert!(
                (product[j] - fd).abs() < 1e-5 * (1.0 + fd.abs()),
                "Jacobian product mismatch at variable {}: analytic {} vs fd {}",
                j,
                product[j],
                fd
            );
        }
    }
}
