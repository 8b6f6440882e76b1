//! Multi-dimensional root finding.
//!
//! [`BroydenSolver`] finds `x` with `F(x) = 0` for a [`VectorFunction`] `F`.
//! It starts from a forward-difference Jacobian and keeps it current with
//! rank-1 secant updates, so each iteration costs one function evaluation
//! and one dense solve.
//!
//! A solver that has already converged once keeps its Jacobian. The next
//! solve "polishes" it with a single random secant step instead of rebuilding,
//! which is what makes repeated calibrations of a slowly moving curve cheap.
//!
//! # Example
//!
//! ```rust
//! use curvecal_math::error::MathError;
//! use curvecal_math::solvers::{BroydenConfig, BroydenSolver, VectorFunction};
//!
//! // x^2 - 4 = 0, y - 1 = 0
//! struct Quadratic;
//!
//! impl VectorFunction for Quadratic {
//!     type Error = MathError;
//!
//!     fn dimension(&self) -> usize {
//!         2
//!     }
//!
//!     fn value(&mut self, x: &[f64]) -> Result<Vec<f64>, MathError> {
//!         Ok(vec![x[0] * x[0] - 4.0, x[1] - 1.0])
//!     }
//! }
//!
//! let mut solver = BroydenSolver::new(BroydenConfig::default());
//! let result = solver.solve(&mut Quadratic, &[1.0, 0.0]).unwrap();
//! assert!((result.root[0] - 2.0).abs() < 1e-8);
//! ```

mod broyden;

pub use broyden::{BroydenResult, BroydenSolver};

use serde::{Deserialize, Serialize};

use crate::error::MathError;

/// Default infinity-norm tolerance on the residual vector.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Default finite-difference bump.
pub const DEFAULT_BUMP: f64 = 1e-6;

/// Default maximum iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Default polish acceptance threshold, in multiples of the bump.
pub const DEFAULT_POLISH_THRESHOLD: f64 = 5.0;

/// A vector-valued function `F: R^n -> R^n`.
///
/// `value` takes `&mut self` because evaluating a calibration objective
/// mutates the curves it prices against.
pub trait VectorFunction {
    /// Error raised by an evaluation.
    type Error: From<MathError>;

    /// Number of inputs, which is also the number of outputs.
    fn dimension(&self) -> usize;

    /// Evaluates the function at `x`.
    fn value(&mut self, x: &[f64]) -> Result<Vec<f64>, Self::Error>;
}

/// Configuration for the Broyden solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BroydenConfig {
    /// Convergence threshold on the infinity norm of the residuals.
    pub tolerance: f64,
    /// Finite-difference bump for Jacobian construction and polishing.
    pub bump: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
    /// A polish step only corrects the Jacobian when the mismatch between
    /// predicted and actual residual change is at least this many bumps.
    pub polish_threshold: f64,
    /// Seed for the random polish direction.
    pub seed: u64,
}

impl Default for BroydenConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            bump: DEFAULT_BUMP,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            polish_threshold: DEFAULT_POLISH_THRESHOLD,
            seed: 42,
        }
    }
}

impl BroydenConfig {
    /// Creates a new solver configuration.
    #[must_use]
    pub fn new(tolerance: f64, bump: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            bump,
            max_iterations,
            ..Self::default()
        }
    }

    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the finite-difference bump.
    #[must_use]
    pub fn with_bump(mut self, bump: f64) -> Self {
        self.bump = bump;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the polish acceptance threshold.
    #[must_use]
    pub fn with_polish_threshold(mut self, polish_threshold: f64) -> Self {
        self.polish_threshold = polish_threshold;
        self
    }

    /// Sets the random seed used for polish directions.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
