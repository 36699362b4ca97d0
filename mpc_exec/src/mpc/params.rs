//! MPC controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::nlp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the MPC controller.
///
/// The defaults reproduce the tuning the controller was calibrated with
/// against the simulator. The horizon length and step duration change the
/// size of every solver vector and the numerical conditioning of the
/// problem, they are fixed for the lifetime of a controller instance.
#[derive(Deserialize, Debug, Clone)]
pub struct Params {

    /// Number of prediction steps in the horizon. Must be at least 2. Long
    /// horizons slow the solve down noticeably.
    pub n_steps: usize,

    /// Duration of a single prediction step.
    ///
    /// Units: seconds
    pub step_duration_s: f64,

    /// Distance from the vehicle's centre of gravity to the front axle.
    /// Calibrated by matching the model's turning radius against the
    /// vehicle's at constant steering angle and speed.
    ///
    /// Units: metres
    pub lf_m: f64,

    /// Target cruising speed demand.
    ///
    /// Units: metres/second
    pub ref_speed_ms: f64,

    /// Number of whole prediction steps of actuation latency to compensate
    /// for. The dynamics apply the actuator demand decided this many steps
    /// before the one that would otherwise take effect. Zero disables the
    /// compensation.
    pub latency_steps: usize,

    /// Steering demand magnitude limit.
    ///
    /// Units: radians
    pub steer_bound_rad: f64,

    /// Acceleration demand magnitude limit (normalised throttle/brake).
    pub accel_bound: f64,

    /// Cost term weights
    pub weights: CostWeights,

    /// Solver settings
    pub solver: nlp::Params,
}

/// Weights of the individual cost terms.
///
/// Path adherence dominates comfort: the tracking weights sit well above the
/// effort weights, which sit above the smoothness weights.
#[derive(Deserialize, Debug, Clone)]
pub struct CostWeights {

    /// Cross-track error tracking weight
    pub cte: f64,

    /// Heading error tracking weight
    pub heading: f64,

    /// Speed tracking weight
    pub speed: f64,

    /// Steering-at-speed effort weight, applied to `(steer * speed)^2`.
    /// Penalises sharp turns at high speed.
    pub steer_speed: f64,

    /// Steering effort weight
    pub steer: f64,

    /// Acceleration effort weight
    pub accel: f64,

    /// Steering smoothness weight, applied to the difference between
    /// consecutive steering demands
    pub steer_rate: f64,

    /// Acceleration smoothness weight, applied to the difference between
    /// consecutive acceleration demands
    pub accel_rate: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Params {
            n_steps: 10,
            step_duration_s: 0.1,
            lf_m: 2.67,
            ref_speed_ms: 100.0,
            latency_steps: 1,
            // 25 degrees
            steer_bound_rad: 0.436332,
            accel_bound: 1.0,
            weights: CostWeights::default(),
            solver: nlp::Params::default(),
        }
    }
}

impl Default for CostWeights {
    fn default() -> Self {
        CostWeights {
            cte: 800.0,
            heading: 800.0,
            speed: 1.0,
            steer_speed: 450.0,
            steer: 20.0,
            accel: 1.0,
            steer_rate: 1.0,
            accel_rate: 1.0,
        }
    }
}
