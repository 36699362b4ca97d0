//! Reference path model
//!
//! The desired path is handed to the controller as a cubic polynomial fitted
//! in the vehicle's local frame (the fitting itself happens upstream of this
//! module). Coefficients are stored in ascending powers of x.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::MpcError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of polynomial coefficients describing the reference path.
pub const NUM_COEFFS: usize = 4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Cubic polynomial approximating the reference path.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RefPoly([f64; NUM_COEFFS]);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RefPoly {
    pub fn new(coeffs: [f64; NUM_COEFFS]) -> Self {
        RefPoly(coeffs)
    }

    /// Build a polynomial from a coefficient slice in ascending powers.
    ///
    /// Slices of any length other than 4 are rejected.
    pub fn from_slice(coeffs: &[f64]) -> Result<Self, MpcError> {
        if coeffs.len() != NUM_COEFFS {
            return Err(MpcError::InvalidCoeffCount(coeffs.len()));
        }

        let mut c = [0f64; NUM_COEFFS];
        c.copy_from_slice(coeffs);

        Ok(RefPoly(c))
    }

    /// Evaluate the path height at longitudinal position `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        let c = &self.0;
        ((c[3] * x + c[2]) * x + c[1]) * x + c[0]
    }

    /// First derivative of the path at `x`.
    pub fn slope(&self, x: f64) -> f64 {
        let c = &self.0;
        (3.0 * c[3] * x + 2.0 * c[2]) * x + c[1]
    }

    /// Second derivative of the path at `x`.
    pub fn slope_derivative(&self, x: f64) -> f64 {
        let c = &self.0;
        6.0 * c[3] * x + 2.0 * c[2]
    }

    /// The path's local tangent direction at `x`, in radians.
    pub fn desired_heading(&self, x: f64) -> f64 {
        self.slope(x).atan()
    }

    /// True if every coefficient is a finite number.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}
