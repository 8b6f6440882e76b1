//! Bracket interpolators for yield curve knots.
//!
//! Every interpolator in this module works on a knot set `(xs, ys)` owned by
//! someone else (typically a curve) and follows the same two-step contract:
//!
//! 1. [`BracketInterpolator::initialize`] precomputes whatever derived arrays
//!    the scheme needs (discount factors, second derivatives, forwards, ...).
//! 2. [`BracketInterpolator::interpolate`] evaluates inside a single bracket
//!    `[xs[i], xs[i + 1]]` that the caller has already located.
//!
//! Bracket location, exact-knot lookup and extrapolation policy belong to the
//! caller. The interpolators only check that the query really lies inside the
//! bracket they were handed.
//!
//! # Available Methods
//!
//! - [`LinearZero`]: linear on the stored values
//! - [`LinearDiscountFactor`]: linear on discount factors `exp(-y t)`
//! - [`FlatForward`]: linear on `y t`, i.e. piecewise flat forwards
//! - [`CubicSpline`]: natural cubic spline
//! - [`MonotoneConvex`]: Hagan-West monotone convex forwards
//!
//! | Method | Precompute | Smoothness | Positive Forwards |
//! |--------|------------|------------|-------------------|
//! | Linear zero | none | C0 | No |
//! | Linear discount factor | `O(n)` | C0 | If DFs decrease |
//! | Flat forward | `O(n)` | C0 | If `y t` increases |
//! | Cubic spline | `O(n)` tridiagonal | C2 | No |
//! | Monotone convex | `O(n)` | C1 | **Yes** |
//!
//! Abscissas are day serials; schemes that need a time measure convert with
//! [`DAYS_PER_YEAR`] relative to the first knot.

mod cubic_spline;
mod flat_forward;
mod linear;
mod linear_discount_factor;
mod monotone_convex;

pub use cubic_spline::CubicSpline;
pub use flat_forward::FlatForward;
pub use linear::LinearZero;
pub use linear_discount_factor::LinearDiscountFactor;
pub use monotone_convex::MonotoneConvex;

use crate::error::{MathError, MathResult};

/// Days per year used to turn day serials into year fractions.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Slack allowed when checking that a query lies inside its bracket.
pub const BRACKET_TOLERANCE: f64 = 1e-9;

/// Two-step interpolation contract shared by all curve interpolators.
pub trait BracketInterpolator {
    /// Rebuilds the derived arrays from the knots.
    ///
    /// Called once at construction and again every time the owner mutates
    /// its values.
    fn initialize(&mut self, xs: &[f64], ys: &[f64]) -> MathResult<()>;

    /// Interpolates at `x` inside the bracket `[xs[index], xs[index + 1]]`.
    ///
    /// `xs` and `ys` must be the same knots the interpolator was last
    /// initialized with.
    fn interpolate(&self, xs: &[f64], ys: &[f64], index: usize, x: f64) -> MathResult<f64>;
}

/// Checks the knot arrays handed to `initialize`.
pub(crate) fn check_knots(xs: &[f64], ys: &[f64]) -> MathResult<()> {
    if xs.len() != ys.len() {
        return Err(MathError::invalid_input(format!(
            "xs and ys must have same length: {} vs {}",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 2 {
        return Err(MathError::insufficient_data(2, xs.len()));
    }
    Ok(())
}

/// Returns the bracket end points after checking that `x` lies inside them.
pub(crate) fn bracket(xs: &[f64], index: usize, x: f64) -> MathResult<(f64, f64)> {
    if index + 1 >= xs.len() {
        return Err(MathError::invalid_input(format!(
            "bracket index {index} out of range for {} knots",
            xs.len()
        )));
    }

    let lower = xs[index];
    let upper = xs[index + 1];
    if x < lower - BRACKET_TOLERANCE || x > upper + BRACKET_TOLERANCE {
        return Err(MathError::not_bracketed(x, lower, upper));
    }
    Ok((lower, upper))
}

/// Year fraction of `x` measured from the first knot.
#[inline]
pub(crate) fn year_fraction(x0: f64, x: f64) -> f64 {
    (x - x0) / DAYS_PER_YEAR
}
