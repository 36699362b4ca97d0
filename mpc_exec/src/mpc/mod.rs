//! # Model predictive control module
//!
//! The controller steers the vehicle along a locally-fitted reference path
//! by solving, once per control cycle, a finite-horizon optimisation problem
//! over the vehicle's predicted motion. The prediction uses a kinematic
//! bicycle model discretised at a fixed step duration, and the path is
//! described by a cubic polynomial in the vehicle's local frame.
//!
//! All predicted states and actuator demands are packed into a single flat
//! variable vector whose layout is owned by [`HorizonLayout`]. The objective
//! trades path adherence (cross-track and heading error, speed tracking)
//! against actuator effort and smoothness, and the model equations enter the
//! problem as hard equality constraints, with the first predicted state
//! pinned to the measured one. Actuation latency is compensated by feeding
//! the dynamics the actuator demand from a configurable number of steps
//! earlier.
//!
//! The optimisation itself is delegated to the external solver behind
//! [`crate::nlp`]. The controller only formulates the problem and extracts
//! the first actuator pair plus the predicted positions from the solution.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cost;
mod dynamics;
mod horizon;
mod params;
mod problem;
mod ref_path;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use horizon::{HorizonLayout, NUM_ACTUATORS, NUM_STATES};
pub use params::{CostWeights, Params};
pub use problem::Problem;
pub use ref_path::{RefPoly, NUM_COEFFS};
pub use state::{InputData, MpcCtrl, OutputData, StatusReport, VehicleState};

use crate::nlp;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MpcCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum MpcError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(#[from] util::params::LoadError),

    /// The prediction horizon must contain at least 2 steps, a horizon of 1
    /// has no actuator variables to optimise.
    #[error("Prediction horizon must be at least 2 steps, got {0}")]
    HorizonTooShort(usize),

    #[error("Prediction step duration must be positive, got {0} s")]
    InvalidStepDuration(f64),

    #[error("Expected a 6 element state vector, got {0} elements")]
    InvalidStateDim(usize),

    #[error("Expected 4 path coefficients, got {0}")]
    InvalidCoeffCount(usize),

    /// The solver finished without reaching its tolerances. The output must
    /// not be used as an actuation demand, the caller decides the fallback.
    #[error("The solver did not converge ({0:?})")]
    ConvergenceFailure(nlp::Status),

    /// A non-finite value appeared in the inputs or during evaluation of the
    /// cost or constraints.
    #[error("Non-finite value encountered in {0}")]
    NumericAnomaly(&'static str),
}
