//! Linear interpolation on stored values.

use crate::error::MathResult;
use crate::interpolation::{bracket, check_knots, BracketInterpolator};

/// Straight-line interpolation on the stored values.
///
/// When the values are zero rates this is the classic "linear on zeros"
/// scheme. It needs no precomputation.
///
/// # Example
///
/// ```rust
/// use curvecal_math::interpolation::{BracketInterpolator, LinearZero};
///
/// let xs = [0.0, 10.0];
/// let ys = [1.0, 3.0];
///
/// let interp = LinearZero::default();
/// let y = interp.interpolate(&xs, &ys, 0, 5.0).unwrap();
/// assert!((y - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearZero;

impl BracketInterpolator for LinearZero {
    fn initialize(&mut self, xs: &[f64], ys: &[f64]) -> MathResult<()> {
        check_knots(xs, ys)
    }

    fn interpolate(&self, xs: &[f64], ys: &[f64], index: usize, x: f64) -> MathResult<f64> {
        let (x1, x2) = bracket(xs, index, x)?;
        let y1 = ys[index];
        let y2 = ys[index + 1];

        Ok(y1 + (x - x1) * (y2 - y1) / (x2 - x1))
    }
}
