//! Monotone Convex interpolation (Hagan-West method).
//!
//! Interpolates on instantaneous forward rates so that the forward curve
//! stays inside a positivity band around the discrete forwards:
//!
//! 1. Discrete forwards `fd[i] = (t[i] y[i] - t[i-1] y[i-1]) / (t[i] - t[i-1])`
//! 2. Knot forwards `f[i]` as the time-weighted average of `fd[i]` and `fd[i+1]`
//! 3. Boundary forwards extrapolated from the first/last discrete forward
//! 4. Every knot forward collared into `[0, 2 min(fd[i], fd[i+1])]`
//!
//! Evaluation inside a bracket adds a zone-dependent correction `G` built
//! from `g0 = f[i] - fd[i+1]` and `g1 = f[i+1] - fd[i+1]`.
//!
//! Reference: Hagan, P. & West, G. (2006) "Interpolation Methods for Curve Construction"

use crate::error::MathResult;
use crate::interpolation::{bracket, check_knots, year_fraction, BracketInterpolator};

/// Monotone convex interpolation for yield curve construction.
///
/// Year fractions are measured from the first knot, so `terms()[0] == 0`.
/// Queries at or before the first knot return the boundary forward `f[0]`.
///
/// # Example
///
/// ```rust
/// use curvecal_math::interpolation::{BracketInterpolator, MonotoneConvex};
///
/// let xs = vec![44287.0, 44652.0, 45017.0, 46113.0];
/// let ys = vec![0.010, 0.015, 0.020, 0.025];
///
/// let mut interp = MonotoneConvex::default();
/// interp.initialize(&xs, &ys).unwrap();
///
/// for f in interp.forwards() {
///     assert!(*f >= 0.0);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MonotoneConvex {
    /// Year fractions from the first knot
    terms: Vec<f64>,
    /// Discrete forwards; index 0 is unused
    discrete_forwards: Vec<f64>,
    /// Collared instantaneous forwards at each knot
    forwards: Vec<f64>,
}

impl MonotoneConvex {
    /// Returns the knot year fractions.
    #[must_use]
    pub fn terms(&self) -> &[f64] {
        &self.terms
    }

    /// Returns the discrete forward rates. Entry `i` covers `[t[i-1], t[i]]`.
    #[must_use]
    pub fn discrete_forwards(&self) -> &[f64] {
        &self.discrete_forwards
    }

    /// Returns the collared instantaneous forwards at each knot.
    #[must_use]
    pub fn forwards(&self) -> &[f64] {
        &self.forwards
    }

    /// Zone-dependent correction term for position `x` in `[0, 1]`.
    fn correction(g0: f64, g1: f64, x: f64, length: f64, elapsed: f64) -> f64 {
        if x == 0.0 || x == 1.0 {
            return 0.0;
        }

        let zone1 = (g0 <= 0.0 && -0.5 * g0 <= g1 && g1 <= -2.0 * g0)
            || (g0 > 0.0 && -0.5 * g0 >= g1 && g1 >= -2.0 * g0);
        let zone2 = (g0 <= 0.0 && -2.0 * g0 < g1 && g1 <= -0.5 * g0)
            || (g0 > 0.0 && -2.0 * g0 > g1 && g1 >= -0.5 * g0);

        if zone1 {
            length * (g0 * cubic(x, 1.0, -2.0, 1.0) + g1 * cubic(x, 0.0, 0.0, 0.0))
        } else if zone2 {
            let eta = g1 / (g1 - g0);
            if x <= eta {
                g0 * elapsed
            } else {
                g0 * elapsed + (g1 - g0) * (x - eta).powi(3) / (eta - x).powi(2)
            }
        } else if g0 == 0.0 && g1 == 0.0 {
            0.0
        } else {
            let eta = g1 / (g1 + g0);
            if x <= eta {
                length * (g0 * cubic(x, 1.0, -2.0, 1.0) + g1 * cubic(x, 0.0, 0.0, 0.0))
            } else {
                length * (g0 * cubic(x, 1.0, -1.0, 1.0) + g1 * cubic(x, 0.0, 0.0, 0.0))
            }
        }
    }
}

impl BracketInterpolator for MonotoneConvex {
    fn initialize(&mut self, xs: &[f64], ys: &[f64]) -> MathResult<()> {
        check_knots(xs, ys)?;

        let n = xs.len() - 1;
        let x0 = xs[0];
        let t: Vec<f64> = xs.iter().map(|&x| year_fraction(x0, x)).collect();

        let mut fd = vec![0.0; n + 1];
        for i in 1..=n {
            fd[i] = (t[i] * ys[i] - t[i - 1] * ys[i - 1]) / (t[i] - t[i - 1]);
        }

        let mut f = vec![0.0; n + 1];
        for i in 1..n {
            let span = t[i + 1] - t[i - 1];
            f[i] = (t[i] - t[i - 1]) / span * fd[i + 1] + (t[i + 1] - t[i]) / span * fd[i];
        }

        // With a single bracket f[n] still reads the freshly set f[0].
        f[0] = collar(0.0, fd[1] - 0.5 * (f[1] - fd[1]), 2.0 * fd[1]);
        f[n] = collar(0.0, fd[n] - 0.5 * (f[n - 1] - fd[n]), 2.0 * fd[n]);

        for i in 1..n {
            f[i] = collar(0.0, f[i], 2.0 * fd[i].min(fd[i + 1]));
        }

        self.terms = t;
        self.discrete_forwards = fd;
        self.forwards = f;
        Ok(())
    }

    fn interpolate(&self, xs: &[f64], ys: &[f64], index: usize, x: f64) -> MathResult<f64> {
        bracket(xs, index, x)?;

        let i = index;
        let term = year_fraction(xs[0], x);
        if term <= 0.0 {
            return Ok(self.forwards[0]);
        }

        let t = &self.terms;
        let fd = &self.discrete_forwards;
        let f = &self.forwards;

        let length = t[i + 1] - t[i];
        let pos = (term - t[i]) / length;
        let g0 = f[i] - fd[i + 1];
        let g1 = f[i + 1] - fd[i + 1];

        let g = Self::correction(g0, g1, pos, length, term - t[i]);

        Ok((g + t[i] * ys[i] + term * (fd[i + 1] - f[i])) / term)
    }
}

/// Returns `max(lo, min(value, hi))`.
#[inline]
fn collar(lo: f64, value: f64, hi: f64) -> f64 {
    lo.max(value.min(hi))
}

/// Evaluates `a x^3 + b x^2 + c x`.
#[inline]
fn cubic(x: f64, a: f64, b: f64, c: f64) -> f64 {
    ((a * x + b) * x + c) * x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::DAYS_PER_YEAR;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn build(xs: &[f64], ys: &[f64]) -> MonotoneConvex {
        let mut interp = MonotoneConvex::default();
        interp.initialize(xs, ys).unwrap();
        interp
    }

    #[test]
    fn test_collar() {
        assert_eq!(collar(0.0, -1.0, 2.0), 0.0);
        assert_eq!(collar(0.0, 1.0, 2.0), 1.0);
        assert_eq!(collar(0.0, 3.0, 2.0), 2.0);
        // An inverted band resolves to the lower bound.
        assert_eq!(collar(0.0, 1.0, -2.0), 0.0);
    }

    #[test]
    fn test_cubic() {
        assert_relative_eq!(cubic(0.5, 1.0, -2.0, 1.0), 0.125);
        assert_eq!(cubic(0.3, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_discrete_forwards() {
        let xs = vec![44287.0, 44652.0, 45017.0];
        let ys = vec![0.0, 0.02, 0.03];
        let interp = build(&xs, &ys);

        let fd = interp.discrete_forwards();
        assert_relative_eq!(fd[1], 0.02, epsilon = 1e-14);
        // (2 * 0.03 - 1 * 0.02) / 1
        assert_relative_eq!(fd[2], 0.04, epsilon = 1e-14);
        assert_relative_eq!(interp.terms()[2], 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_single_bracket_boundary_forwards() {
        let xs = vec![44287.0, 44652.0];
        let ys = vec![0.01, 0.02];
        let interp = build(&xs, &ys);

        let f = interp.forwards();
        // f[0] = collar(0, 0.02 - 0.5 * (0 - 0.02), 0.04)
        assert_relative_eq!(f[0], 0.03, epsilon = 1e-14);
        // f[1] = collar(0, 0.02 - 0.5 * (0.03 - 0.02), 0.04)
        assert_relative_eq!(f[1], 0.015, epsilon = 1e-14);
    }

    #[test]
    fn test_flat_curve() {
        let xs = vec![44287.0, 44652.0, 45017.0, 45382.0];
        let ys = vec![0.03; 4];
        let interp = build(&xs, &ys);

        for f in interp.forwards() {
            assert_relative_eq!(*f, 0.03, epsilon = 1e-14);
        }

        // g0 == g1 == 0, so only the knot term survives.
        let x = 44834.5;
        let term = 1.5;
        let y = interp.interpolate(&xs, &ys, 1, x).unwrap();
        assert_relative_eq!(y, 0.03 / term, epsilon = 1e-14);
    }

    #[test]
    fn test_origin_returns_boundary_forward() {
        let xs = vec![44287.0, 44652.0, 45017.0];
        let ys = vec![0.01, 0.02, 0.025];
        let interp = build(&xs, &ys);

        let y = interp.interpolate(&xs, &ys, 0, 44287.0).unwrap();
        assert_relative_eq!(y, interp.forwards()[0]);
    }

    #[test]
    fn test_negative_discrete_forward_collars_to_zero() {
        // Steeply inverted: rt falls from 1Y to 2Y.
        let xs = vec![44287.0, 44652.0, 45017.0, 45382.0];
        let ys = vec![0.05, 0.05, 0.01, 0.01];
        let interp = build(&xs, &ys);

        assert!(interp.discrete_forwards()[2] < 0.0);
        assert_eq!(interp.forwards()[1], 0.0);
        assert_eq!(interp.forwards()[2], 0.0);
    }

    #[test]
    fn test_outside_bracket() {
        let xs = vec![44287.0, 44652.0, 45017.0];
        let ys = vec![0.01, 0.02, 0.025];
        let interp = build(&xs, &ys);

        assert!(interp.interpolate(&xs, &ys, 0, 44800.0).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn test_forwards_stay_in_collar_band(
            gaps in prop::collection::vec(20.0f64..800.0, 1..15),
            fwds in prop::collection::vec(0.0005f64..0.12, 15),
        ) {
            // Build zero rates from positive discrete forwards.
            let mut xs = vec![44287.0];
            let mut ys = vec![0.0];
            let mut rt = 0.0;
            for (k, gap) in gaps.iter().enumerate() {
                let x_prev = xs[xs.len() - 1];
                let x = x_prev + gap;
                rt += fwds[k] * gap / DAYS_PER_YEAR;
                xs.push(x);
                ys.push(rt / ((x - 44287.0) / DAYS_PER_YEAR));
            }

            let interp = build(&xs, &ys);
            let fd = interp.discrete_forwards();
            let f = interp.forwards();
            let n = xs.len() - 1;
            let tol = 1e-12;

            prop_assert!(f[0] >= 0.0 && f[0] <= 2.0 * fd[1] + tol);
            prop_assert!(f[n] >= 0.0 && f[n] <= 2.0 * fd[n] + tol);
            for i in 1..n {
                prop_assert!(f[i] >= 0.0);
                prop_assert!(f[i] <= 2.0 * fd[i].min(fd[i + 1]) + tol);
            }
        }
    }
}
