//! Linear interpolation on discount factors.

use crate::error::MathResult;
use crate::interpolation::{bracket, check_knots, year_fraction, BracketInterpolator};

/// Linear interpolation on discount factors, converted back to a zero rate.
///
/// `initialize` stores `df[i] = exp(-y[i] * t[i])` with `t` measured in years
/// from the first knot. A query interpolates `df` linearly and returns
/// `-ln(df) / t`. At `t == 0` the first stored rate is returned unchanged,
/// before any bracket check.
#[derive(Debug, Clone, Default)]
pub struct LinearDiscountFactor {
    discount_factors: Vec<f64>,
}

impl LinearDiscountFactor {
    /// Returns the precomputed discount factors.
    #[must_use]
    pub fn discount_factors(&self) -> &[f64] {
        &self.discount_factors
    }
}

impl BracketInterpolator for LinearDiscountFactor {
    fn initialize(&mut self, xs: &[f64], ys: &[f64]) -> MathResult<()> {
        check_knots(xs, ys)?;

        let x0 = xs[0];
        self.discount_factors = xs
            .iter()
            .zip(ys)
            .map(|(&x, &y)| (-y * year_fraction(x0, x)).exp())
            .collect();
        Ok(())
    }

    fn interpolate(&self, xs: &[f64], ys: &[f64], index: usize, x: f64) -> MathResult<f64> {
        let t = year_fraction(xs[0], x);
        if t == 0.0 {
            return Ok(ys[0]);
        }

        let (x1, x2) = bracket(xs, index, x)?;
        let df1 = self.discount_factors[index];
        let df2 = self.discount_factors[index + 1];

        let df = df1 + (x - x1) * ((df2 - df1) / (x2 - x1));
        Ok(-df.ln() / t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_discount_factors_precomputed() {
        let xs = [44287.0, 44652.0, 45017.0];
        let ys = [0.01, 0.02, 0.03];

        let mut interp = LinearDiscountFactor::default();
        interp.initialize(&xs, &ys).unwrap();

        let dfs = interp.discount_factors();
        assert_relative_eq!(dfs[0], 1.0);
        assert_relative_eq!(dfs[1], (-0.02_f64).exp(), epsilon = 1e-15);
        assert_relative_eq!(dfs[2], (-0.06_f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_first_knot_returns_stored_rate() {
        let xs = [44287.0, 44652.0];
        let ys = [0.015, 0.02];

        let mut interp = LinearDiscountFactor::default();
        interp.initialize(&xs, &ys).unwrap();

        // Any bracket index is accepted at t == 0.
        assert_relative_eq!(interp.interpolate(&xs, &ys, 0, 44287.0).unwrap(), 0.015);
    }

    #[test]
    fn test_midpoint_is_linear_in_discount_factor() {
        let xs = [44287.0, 44652.0, 45017.0];
        let ys = [0.01, 0.02, 0.03];

        let mut interp = LinearDiscountFactor::default();
        interp.initialize(&xs, &ys).unwrap();

        let x = 44834.5;
        let df = 0.5 * ((-0.02_f64).exp() + (-0.06_f64).exp());
        let expected = -df.ln() / 1.5;
        assert_relative_eq!(
            interp.interpolate(&xs, &ys, 1, x).unwrap(),
            expected,
            epsilon = 1e-14
        );
    }
}
