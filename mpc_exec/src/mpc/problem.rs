//! Optimisation problem context
//!
//! One `Problem` bundles everything the cost and constraint evaluators need
//! for a single control cycle: the controller configuration, the horizon
//! layout, the measured vehicle state and the reference path polynomial.
//! The evaluators themselves are implemented in the `cost` and `dynamics`
//! modules.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use super::{HorizonLayout, Params, RefPoly, VehicleState};
use crate::nlp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The optimisation problem for one control cycle.
pub struct Problem<'a> {
    pub(crate) params: &'a Params,
    pub(crate) layout: HorizonLayout,
    pub(crate) state: &'a VehicleState,
    pub(crate) poly: &'a RefPoly,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> Problem<'a> {
    pub fn new(
        params: &'a Params,
        layout: HorizonLayout,
        state: &'a VehicleState,
        poly: &'a RefPoly,
    ) -> Self {
        Problem {
            params,
            layout,
            state,
            poly,
        }
    }
}

impl<'a> nlp::Formulation for Problem<'a> {
    fn num_variables(&self) -> usize {
        self.layout.num_variables()
    }

    fn num_constraints(&self) -> usize {
        self.layout.num_constraints()
    }

    fn objective(&self, vars: &[f64]) -> f64 {
        self.cost_value(vars)
    }

    fn objective_gradient(&self, vars: &[f64], grad: &mut [f64]) {
        self.cost_gradient(vars, grad)
    }

    fn constraints(&self, vars: &[f64], residuals: &mut [f64]) {
        self.constraint_values(vars, residuals)
    }

    fn constraints_jacobian_product(&self, vars: &[f64], mult: &[f64], product: &mut [f64]) {
        self.constraint_jacobian_product(vars, mult, product)
    }
}
