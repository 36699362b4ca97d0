//! Horizon layout
//!
//! The solver input is a single flat vector holding every predicted state
//! and actuator demand across the horizon: six state blocks of length N
//! (x, y, psi, v, cte, epsi) followed by two actuator blocks of length N-1
//! (steering, acceleration). This module owns the addressing into that
//! vector, no other module computes offsets itself.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::MpcError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of state quantities predicted at each step.
pub const NUM_STATES: usize = 6;

/// The number of actuator quantities demanded at each step.
pub const NUM_ACTUATORS: usize = 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Block offsets into the flat optimisation vector for a given horizon
/// length.
#[derive(Debug, Clone, Copy)]
pub struct HorizonLayout {
    n_steps: usize,

    x: usize,
    y: usize,
    psi: usize,
    v: usize,
    cte: usize,
    epsi: usize,
    delta: usize,
    a: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HorizonLayout {
    /// Build the layout for a horizon of `n_steps` prediction steps.
    ///
    /// A horizon of fewer than 2 steps would contain no actuator variables
    /// and is rejected.
    pub fn new(n_steps: usize) -> Result<Self, MpcError> {
        if n_steps < 2 {
            return Err(MpcError::HorizonTooShort(n_steps));
        }

        let x = 0;
        let y = x + n_steps;
        let psi = y + n_steps;
        let v = psi + n_steps;
        let cte = v + n_steps;
        let epsi = cte + n_steps;
        let delta = epsi + n_steps;
        let a = delta + n_steps - 1;

        Ok(HorizonLayout {
            n_steps,
            x,
            y,
            psi,
            v,
            cte,
            epsi,
            delta,
            a,
        })
    }

    /// The number of prediction steps in the horizon.
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Total length of the optimisation vector, `6N + 2(N-1)`.
    pub fn num_variables(&self) -> usize {
        NUM_STATES * self.n_steps + NUM_ACTUATORS * (self.n_steps - 1)
    }

    /// Total length of the constraint vector, `6N`.
    pub fn num_constraints(&self) -> usize {
        NUM_STATES * self.n_steps
    }

    /// Index of the x position at step `t`.
    pub fn x(&self, t: usize) -> usize {
        self.x + t
    }

    /// Index of the y position at step `t`.
    pub fn y(&self, t: usize) -> usize {
        self.y + t
    }

    /// Index of the heading at step `t`.
    pub fn psi(&self, t: usize) -> usize {
        self.psi + t
    }

    /// Index of the speed at step `t`.
    pub fn v(&self, t: usize) -> usize {
        self.v + t
    }

    /// Index of the cross-track error at step `t`.
    pub fn cte(&self, t: usize) -> usize {
        self.cte + t
    }

    /// Index of the heading error at step `t`.
    pub fn epsi(&self, t: usize) -> usize {
        self.epsi + t
    }

    /// Index of the steering demand at step `t`. Valid for `t < N - 1`.
    pub fn delta(&self, t: usize) -> usize {
        self.delta + t
    }

    /// Index of the acceleration demand at step `t`. Valid for `t < N - 1`.
    pub fn a(&self, t: usize) -> usize {
        self.a + t
    }

    /// Offsets of the six state blocks, in the fixed block order
    /// (x, y, psi, v, cte, epsi).
    pub fn state_blocks(&self) -> [usize; NUM_STATES] {
        [self.x, self.y, self.psi, self.v, self.cte, self.epsi]
    }
}
