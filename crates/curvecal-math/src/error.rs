//! Error types for mathematical operations.

use thiserror::Error;

/// A specialized Result type for mathematical operations.
pub type MathResult<T> = Result<T, MathError>;

/// Errors that can occur during mathematical operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    /// Root-finding algorithm failed to converge.
    #[error("Convergence failed after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: u32,
        /// Infinity norm of the last residual vector.
        residual: f64,
    },

    /// Matrix is singular (not invertible).
    #[error("Singular matrix: cannot invert")]
    SingularMatrix,

    /// Matrix dimensions are incompatible.
    #[error("Incompatible matrix dimensions: ({rows1}x{cols1}) and ({rows2}x{cols2})")]
    DimensionMismatch {
        /// Rows in first matrix.
        rows1: usize,
        /// Columns in first matrix.
        cols1: usize,
        /// Rows in second matrix.
        rows2: usize,
        /// Columns in second matrix.
        cols2: usize,
    },

    /// A function evaluation returned `NaN` or an infinity.
    #[error("Non-finite function value at position {index}")]
    NonFiniteValue {
        /// Position of the first offending entry.
        index: usize,
    },

    /// Query point lies outside the bracket handed to an interpolator.
    #[error("Not bracketed: {x} is outside [{lower}, {upper}]")]
    NotBracketed {
        /// The query point.
        x: f64,
        /// Left knot of the bracket.
        lower: f64,
        /// Right knot of the bracket.
        upper: f64,
    },

    /// Two adjacent knots share the same abscissa.
    #[error("Knots must be distinct: x[{index}] and its successor both equal {x}")]
    CoincidentKnots {
        /// Index of the left knot.
        index: usize,
        /// The repeated abscissa.
        x: f64,
    },

    /// Insufficient data points for operation.
    #[error("Insufficient data: need at least {required}, got {actual}")]
    InsufficientData {
        /// Minimum required points.
        required: usize,
        /// Actual number of points.
        actual: usize,
    },

    /// Invalid input parameter.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of the invalid input.
        reason: String,
    },
}

impl MathError {
    /// Creates a convergence failed error.
    #[must_use]
    pub fn convergence_failed(iterations: u32, residual: f64) -> Self {
        Self::ConvergenceFailed {
            iterations,
            residual,
        }
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates an insufficient data error.
    #[must_use]
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }

    /// Creates a not-bracketed error.
    #[must_use]
    pub fn not_bracketed(x: f64, lower: f64, upper: f64) -> Self {
        Self::NotBracketed { x, lower, upper }
    }

    /// Creates a dimension mismatch error for a square system and a vector.
    #[must_use]
    pub fn vector_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            rows1: expected,
            cols1: expected,
            rows2: actual,
            cols2: 1,
        }
    }
}
