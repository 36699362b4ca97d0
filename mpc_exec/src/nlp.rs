//! Nonlinear programming interface
//!
//! The controller treats the solver as an opaque service: it hands over an
//! objective (with gradient), an equality constraint mapping (with
//! Jacobian-transpose products), variable bounds, an initial guess and a
//! wall-clock budget, and receives back a tagged outcome with the optimal
//! variable vector. Everything specific to the backend stays inside this
//! module.
//!
//! The backend is the `optimization_engine` augmented-Lagrangian optimiser
//! with a PANOC inner solver: the equality constraints are driven into the
//! zero set while the variables are kept inside their box. The time budget
//! is enforced by the backend and is the only cancellation mechanism, there
//! is no cooperative cancellation of a solve in progress.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use optimization_engine::{
    alm::{AlmCache, AlmFactory, AlmOptimizer, AlmProblem, NO_JACOBIAN_MAPPING, NO_MAPPING},
    constraints::{Ball2, Rectangle, Zero},
    core::ExitStatus,
    panoc::PANOCCache,
    SolverError,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Radius of the ball the Lagrange multiplier estimates are kept inside.
const MULTIPLIER_BALL_RADIUS: f64 = 1.0e12;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A problem the solver can be asked to solve.
///
/// Implementations evaluate the objective and the equality constraint
/// residuals over a flat variable vector, together with the derivatives the
/// backend needs. All output slices are sized by the caller.
pub trait Formulation {
    /// Length of the variable vector.
    fn num_variables(&self) -> usize;

    /// Length of the equality constraint vector.
    fn num_constraints(&self) -> usize;

    /// The scalar objective at `vars`.
    fn objective(&self, vars: &[f64]) -> f64;

    /// The gradient of the objective at `vars`, written into `grad`.
    fn objective_gradient(&self, vars: &[f64], grad: &mut [f64]);

    /// The equality constraint residuals at `vars`, written into
    /// `residuals`. Every residual is zero at a feasible point.
    fn constraints(&self, vars: &[f64], residuals: &mut [f64]);

    /// The Jacobian-transpose product `J(vars)^T * mult`, written into
    /// `product`.
    fn constraints_jacobian_product(&self, vars: &[f64], mult: &[f64], product: &mut [f64]);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Elementwise lower and upper variable bounds.
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Solver settings.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Tolerance on the inner solver's fixed-point residual
    pub tolerance: f64,

    /// Tolerance on constraint satisfaction
    pub delta_tolerance: f64,

    /// Memory length of the inner solver's L-BFGS buffer
    pub lbfgs_memory: usize,

    /// Maximum inner iterations per outer iteration
    pub max_inner_iterations: usize,

    /// Maximum outer iterations
    pub max_outer_iterations: usize,

    /// Initial penalty applied to constraint violation
    pub initial_penalty: f64,

    /// Wall-clock budget for a single solve.
    ///
    /// Units: seconds
    pub max_solve_time_s: f64,
}

/// The result of a completed solver run.
pub struct Outcome {
    /// How the solver finished
    pub status: Status,

    /// The variable vector at the solver's final point
    pub solution: Vec<f64>,

    /// The objective value at the final point, recomputed through the
    /// formulation rather than read from the backend's bookkeeping
    pub objective: f64,

    /// Outer (constraint) iterations taken
    pub outer_iterations: usize,

    /// Total inner iterations taken
    pub inner_iterations: usize,

    /// Wall-clock time of the solve in seconds
    pub solve_time_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How a solver run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    /// All tolerances met
    Converged,

    /// An iteration limit was hit first
    IterationLimit,

    /// The wall-clock budget was exhausted first
    TimeLimit,
}

/// Possible errors raised by a solver run.
#[derive(Debug, thiserror::Error)]
pub enum NlpError {
    /// A non-finite value appeared while evaluating the problem. Carries a
    /// description of where the value was seen.
    #[error("Non-finite value encountered in {0}")]
    NonFinite(&'static str),

    /// The backend rejected the problem outright.
    #[error("The solver backend reported an error: {0:?}")]
    Backend(SolverError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Params {
            tolerance: 1e-4,
            delta_tolerance: 1e-4,
            lbfgs_memory: 10,
            max_inner_iterations: 5000,
            max_outer_iterations: 60,
            initial_penalty: 10.0,
            max_solve_time_s: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run the solver on the given formulation.
///
/// `initial_guess` seeds the variable vector and is not modified. The run is
/// one-shot: no retries are attempted, and a run which ends on an iteration
/// or time limit is reported as such in the outcome's status rather than as
/// an error.
pub fn solve<F: Formulation>(
    formulation: &F,
    bounds: &Bounds,
    initial_guess: &[f64],
    params: &Params,
) -> Result<Outcome, NlpError> {
    let num_constraints = formulation.num_constraints();

    // Every evaluation is checked for non-finite values so the backend never
    // iterates on NaNs
    let f = |vars: &[f64], cost: &mut f64| -> Result<(), SolverError> {
        *cost = formulation.objective(vars);
        if !cost.is_finite() {
            return Err(SolverError::NotFiniteComputation);
        }
        Ok(())
    };

    let df = |vars: &[f64], grad: &mut [f64]| -> Result<(), SolverError> {
        formulation.objective_gradient(vars, grad);
        if !grad.iter().all(|g| g.is_finite()) {
            return Err(SolverError::NotFiniteComputation);
        }
        Ok(())
    };

    let f1 = |vars: &[f64], residuals: &mut [f64]| -> Result<(), SolverError> {
        formulation.constraints(vars, residuals);
        if !residuals.iter().all(|r| r.is_finite()) {
            return Err(SolverError::NotFiniteComputation);
        }
        Ok(())
    };

    let jf1_trans = |vars: &[f64], mult: &[f64], product: &mut [f64]| -> Result<(), SolverError> {
        formulation.constraints_jacobian_product(vars, mult, product);
        if !product.iter().all(|p| p.is_finite()) {
            return Err(SolverError::NotFiniteComputation);
        }
        Ok(())
    };

    let variable_bounds = Rectangle::new(Some(&bounds.lower), Some(&bounds.upper));
    let multiplier_set = Ball2::new(None, MULTIPLIER_BALL_RADIUS);

    let factory = AlmFactory::new(
        f,
        df,
        Some(f1),
        Some(jf1_trans),
        NO_MAPPING,
        NO_JACOBIAN_MAPPING,
        Some(Zero::new()),
        0,
    );

    let alm_problem = AlmProblem::new(
        variable_bounds,
        Some(Zero::new()),
        Some(multiplier_set),
        |vars: &[f64], xi: &[f64], cost: &mut f64| -> Result<(), SolverError> {
            factory.psi(vars, xi, cost)
        },
        |vars: &[f64], xi: &[f64], grad: &mut [f64]| -> Result<(), SolverError> {
            factory.d_psi(vars, xi, grad)
        },
        Some(f1),
        NO_MAPPING,
        num_constraints,
        0,
    );

    let panoc_cache = PANOCCache::new(
        formulation.num_variables(),
        params.tolerance,
        params.lbfgs_memory,
    );
    let mut alm_cache = AlmCache::new(panoc_cache, num_constraints, 0);

    let mut optimiser = AlmOptimizer::new(&mut alm_cache, alm_problem)
        .with_epsilon_tolerance(params.tolerance)
        .with_delta_tolerance(params.delta_tolerance)
        .with_max_inner_iterations(params.max_inner_iterations)
        .with_max_outer_iterations(params.max_outer_iterations)
        .with_initial_penalty(params.initial_penalty)
        .with_max_duration(Duration::from_secs_f64(params.max_solve_time_s));

    let mut solution = initial_guess.to_vec();
    let backend_status = optimiser.solve(&mut solution).map_err(|e| match e {
        SolverError::NotFiniteComputation => NlpError::NonFinite("the problem evaluation"),
        other => NlpError::Backend(other),
    })?;

    let status = match backend_status.exit_status() {
        ExitStatus::Converged => Status::Converged,
        ExitStatus::NotConvergedIterations => Status::IterationLimit,
        ExitStatus::NotConvergedOutOfTime => Status::TimeLimit,
    };

    if !solution.iter().all(|v| v.is_finite()) {
        return Err(NlpError::NonFinite("the solution vector"));
    }

    let objective = formulation.objective(&solution);
    if !objective.is_finite() {
        return Err(NlpError::NonFinite("the objective at the solution"));
    }

    Ok(Outcome {
        status,
        solution,
        objective,
        outer_iterations: backend_status.num_outer_iterations(),
        inner_iterations: backend_status.num_inner_iterations(),
        solve_time_s: backend_status.solve_time().as_secs_f64(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    /// Minimise (u0 - 1)^2 + (u1 - 2)^2 subject to u0 + u1 = 2. The optimum
    /// sits at (0.5, 1.5).
    struct EqualityToy;

    impl Formulation for EqualityToy {
        fn num_variables(&self) -> usize {
            2
        }

        fn num_constraints(&self) -> usize {
            1
        }

        fn objective(&self, vars: &[f64]) -> f64 {
            (vars[0] - 1.0).powi(2) + (vars[1] - 2.0).powi(2)
        }

        fn objective_gradient(&self, vars: &[f64], grad: &mut [f64]) {
            grad[0] = 2.0 * (vars[0] - 1.0);
            grad[1] = 2.0 * (vars[1] - 2.0);
        }

        fn constraints(&self, vars: &[f64], residuals: &mut [f64]) {
            residuals[0] = vars[0] + vars[1] - 2.0;
        }

        fn constraints_jacobian_product(&self, _vars: &[f64], mult: &[f64], product: &mut [f64]) {
            product[0] = mult[0];
            product[1] = mult[0];
        }
    }

    /// A formulation whose objective is never finite.
    struct NanToy;

    impl Formulation for NanToy {
        fn num_variables(&self) -> usize {
            2
        }

        fn num_constraints(&self) -> usize {
            1
        }

        fn objective(&self, _vars: &[f64]) -> f64 {
            std::f64::NAN
        }

        fn objective_gradient(&self, _vars: &[f64], grad: &mut [f64]) {
            grad[0] = 0.0;
            grad[1] = 0.0;
        }

        fn constraints(&self, _vars: &[f64], residuals: &mut [f64]) {
            residuals[0] = 0.0;
        }

        fn constraints_jacobian_product(&self, _vars: &[f64], _mult: &[f64], product: &mut [f64]) {
            product[0] = 0.0;
            product[1] = 0.0;
        }
    }

    fn toy_bounds() -> Bounds {
        Bounds {
            lower: vec![-10.0, -10.0],
            upper: vec![10.0, 10.0],
        }
    }

    #[test]
    fn test_equality_constrained_minimum() {
        let params = Params {
            max_solve_time_s: 30.0,
            ..Params::default()
        };

        let outcome = solve(&EqualityToy, &toy_bounds(), &[0.0, 0.0], &params).unwrap();

        assert_eq!(outcome.status, Status::Converged);
        assert!((outcome.solution[0] - 0.5).abs() < 1e-3);
        assert!((outcome.solution[1] - 1.5).abs() < 1e-3);
        assert!((outcome.objective - 0.5).abs() < 1e-2);
    }

    #[test]
    fn test_non_finite_evaluation_is_an_error() {
        let params = Params::default();

        match solve(&NanToy, &toy_bounds(), &[0.0, 0.0], &params) {
            Err(NlpError::NonFinite(_)) => (),
            Err(other) => panic!("expected NonFinite, got {:?}", other),
            Ok(_) => panic!("expected NonFinite, got an outcome"),
        }
    }
}
