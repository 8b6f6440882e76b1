//! Natural cubic spline interpolation.

use crate::error::{MathError, MathResult};
use crate::interpolation::{bracket, check_knots, BracketInterpolator};

/// Natural cubic spline interpolation.
///
/// Piecewise cubic polynomials with continuous first and second
/// derivatives. "Natural" means the second derivative is zero at both
/// end knots. Two knots degenerate to a straight line.
///
/// # Example
///
/// ```rust
/// use curvecal_math::interpolation::{BracketInterpolator, CubicSpline};
///
/// let xs = vec![0.0, 1.0, 2.0, 3.0];
/// let ys = vec![0.0, 1.0, 4.0, 9.0];
///
/// let mut spline = CubicSpline::default();
/// spline.initialize(&xs, &ys).unwrap();
/// let y = spline.interpolate(&xs, &ys, 1, 1.5).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct CubicSpline {
    /// Second derivatives at each knot
    y2s: Vec<f64>,
}

impl CubicSpline {
    /// Returns the second derivatives computed by the last `initialize`.
    #[must_use]
    pub fn second_derivatives(&self) -> &[f64] {
        &self.y2s
    }
}

impl BracketInterpolator for CubicSpline {
    fn initialize(&mut self, xs: &[f64], ys: &[f64]) -> MathResult<()> {
        check_knots(xs, ys)?;
        if let Some(i) = xs.windows(2).position(|w| w[1] == w[0]) {
            return Err(MathError::CoincidentKnots { index: i, x: xs[i] });
        }

        self.y2s = compute_second_derivatives(xs, ys);
        Ok(())
    }

    fn interpolate(&self, xs: &[f64], ys: &[f64], index: usize, x: f64) -> MathResult<f64> {
        let (x_lo, x_hi) = bracket(xs, index, x)?;

        let h = x_hi - x_lo;
        if h == 0.0 {
            return Err(MathError::CoincidentKnots { index, x: x_lo });
        }

        let y_lo = ys[index];
        let y_hi = ys[index + 1];
        let y2_lo = self.y2s[index];
        let y2_hi = self.y2s[index + 1];

        let a = (x_hi - x) / h;
        let b = (x - x_lo) / h;

        let y = a * y_lo
            + b * y_hi
            + ((a * a * a - a) * y2_lo + (b * b * b - b) * y2_hi) * (h * h) / 6.0;

        Ok(y)
    }
}

/// Computes the second derivatives for a natural cubic spline.
fn compute_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut y2s = vec![0.0; n];
    let mut u = vec![0.0; n - 1];

    // Decomposition loop
    for i in 1..n - 1 {
        let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
        let p = sig * y2s[i - 1] + 2.0;
        y2s[i] = (sig - 1.0) / p;
        u[i] = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
            - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
        u[i] = (6.0 * u[i] / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
    }

    // Natural boundary at both ends
    y2s[n - 1] = 0.0;

    // Back-substitution loop
    for i in (0..n - 1).rev() {
        y2s[i] = y2s[i] * y2s[i + 1] + u[i];
    }

    y2s
}
