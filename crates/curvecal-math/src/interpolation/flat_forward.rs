//! Flat forward interpolation.
//!
//! Flat forward interpolation holds the instantaneous forward rate constant
//! between knots. With zero rates `r_i` at year fractions `t_i` the product
//! `r t` is interpolated linearly:
//!
//! ```text
//! r(t) = (r_i t_i + f_i (t - t_i)) / t
//! f_i  = (r_{i+1} t_{i+1} - r_i t_i) / (t_{i+1} - t_i)
//! ```
//!
//! Forward rates are positive wherever `r t` increases between knots.

use crate::error::MathResult;
use crate::interpolation::{bracket, check_knots, year_fraction, BracketInterpolator};

/// Flat forward interpolation for zero rate curves.
///
/// Year fractions are measured from the first knot, so the first knot sits
/// at `t == 0` and returns its stored rate directly.
#[derive(Debug, Clone, Default)]
pub struct FlatForward {
    /// `y[i] * t[i]` for every knot.
    rate_times: Vec<f64>,
}

impl FlatForward {
    /// Returns the precomputed `y * t` products.
    #[must_use]
    pub fn rate_times(&self) -> &[f64] {
        &self.rate_times
    }

    /// Returns the flat forward rate on the segment `[xs[index], xs[index + 1]]`.
    ///
    /// Returns `None` when `index` is not a valid segment.
    #[must_use]
    pub fn segment_forward(&self, xs: &[f64], index: usize) -> Option<f64> {
        if index + 1 >= self.rate_times.len() || index + 1 >= xs.len() {
            return None;
        }
        let dt = year_fraction(xs[index], xs[index + 1]);
        Some((self.rate_times[index + 1] - self.rate_times[index]) / dt)
    }
}

impl BracketInterpolator for FlatForward {
    fn initialize(&mut self, xs: &[f64], ys: &[f64]) -> MathResult<()> {
        check_knots(xs, ys)?;

        let x0 = xs[0];
        self.rate_times = xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| y * year_fraction(x0, x))
            .collect();
        Ok(())
    }

    fn interpolate(&self, xs: &[f64], ys: &[f64], index: usize, x: f64) -> MathResult<f64> {
        let t = year_fraction(xs[0], x);
        if t == 0.0 {
            return Ok(ys[0]);
        }

        let (x1, x2) = bracket(xs, index, x)?;
        let rt1 = self.rate_times[index];
        let rt2 = self.rate_times[index + 1];

        let rt = rt1 + (x - x1) * ((rt2 - rt1) / (x2 - x1));
        Ok(rt / t)
    }
}
