//! Error types for curve operations.
//!
//! Every failure in this crate is an engine error that propagates to the
//! calibration driver. Two families get their own classification helpers:
//!
//! - **Extrapolation**: a query strictly outside the knot range, tagged with
//!   the side of the curve it fell off. Callers may choose to recover.
//! - **Convergence**: the solver hit its iteration cap, or a trial vector
//!   carried `NaN`/`Inf` into an adjustment.

use std::fmt;

use curvecal_math::MathError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A specialized Result type for curve operations.
pub type CurveResult<T> = Result<T, CurveError>;

/// End of a curve an out-of-range query fell off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveSide {
    /// Before the first knot.
    ShortEnd,
    /// After the last knot.
    LongEnd,
}

impl fmt::Display for CurveSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortEnd => write!(f, "short end"),
            Self::LongEnd => write!(f, "long end"),
        }
    }
}

/// One of the two coupled legs managed by the curve adjuster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveLeg {
    /// The anchor (discounting) leg.
    Anchor,
    /// The basis leg, stored as a spread over the anchor.
    Basis,
}

impl fmt::Display for CurveLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anchor => write!(f, "anchor"),
            Self::Basis => write!(f, "basis"),
        }
    }
}

/// Error types for curve operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    /// Malformed curve or interpolation state.
    #[error("Invalid curve: {reason}")]
    InvalidCurve {
        /// Description of the problem.
        reason: String,
    },

    /// Query strictly outside the knot range.
    #[error("Cannot extrapolate at {side}: {x} is outside [{min}, {max}]")]
    ExtrapolationOutOfRange {
        /// Which end of the curve was missed.
        side: CurveSide,
        /// The query point.
        x: f64,
        /// First knot.
        min: f64,
        /// Last knot.
        max: f64,
    },

    /// Configuration or invariant violation in the adjustment layer.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Description of the violation.
        reason: String,
    },

    /// The root solver hit its iteration cap.
    #[error("Convergence failure after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailure {
        /// Number of iterations attempted.
        iterations: u32,
        /// Infinity norm of the final residuals.
        residual: f64,
    },

    /// A trial adjustment vector carried a non-finite entry.
    #[error("Non-finite adjustment on {leg} leg of {curve_index} at position {index}")]
    NonFiniteAdjustment {
        /// Leg the offending entry belongs to.
        leg: CurveLeg,
        /// Position within that leg's slice of the vector.
        index: usize,
        /// Rate index name of the leg.
        curve_index: String,
    },

    /// Any other numerical failure.
    #[error("Math error: {0}")]
    Math(MathError),
}

impl CurveError {
    /// Creates an invalid curve error.
    #[must_use]
    pub fn invalid_curve(reason: impl Into<String>) -> Self {
        Self::InvalidCurve {
            reason: reason.into(),
        }
    }

    /// Creates an extrapolation error for a query outside `[min, max]`.
    #[must_use]
    pub fn extrapolation(x: f64, min: f64, max: f64) -> Self {
        let side = if x < min {
            CurveSide::ShortEnd
        } else {
            CurveSide::LongEnd
        };
        Self::ExtrapolationOutOfRange { side, x, min, max }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates a non-finite adjustment error.
    #[must_use]
    pub fn non_finite(leg: CurveLeg, index: usize, curve_index: impl Into<String>) -> Self {
        Self::NonFiniteAdjustment {
            leg,
            index,
            curve_index: curve_index.into(),
        }
    }

    /// Returns true for out-of-range queries.
    #[must_use]
    pub fn is_extrapolation(&self) -> bool {
        matches!(self, Self::ExtrapolationOutOfRange { .. })
    }

    /// Returns true for solver divergence and for non-finite trial vectors
    /// or residuals.
    #[must_use]
    pub fn is_convergence(&self) -> bool {
        matches!(
            self,
            Self::ConvergenceFailure { .. }
                | Self::NonFiniteAdjustment { .. }
                | Self::Math(MathError::NonFiniteValue { .. })
        )
    }

    /// Returns true for errors raised by the adjustment engine itself
    /// rather than by curve construction or evaluation.
    #[must_use]
    pub fn is_engine(&self) -> bool {
        matches!(self, Self::Configuration { .. }) || self.is_convergence()
    }

    /// Returns true unless the error is an extrapolation miss.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_extrapolation()
    }
}

impl From<MathError> for CurveError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::ConvergenceFailed {
                iterations,
                residual,
            } => Self::ConvergenceFailure {
                iterations,
                residual,
            },
            other => Self::Math(other),
        }
    }
}
