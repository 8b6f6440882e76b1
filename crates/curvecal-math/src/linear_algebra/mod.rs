//! Linear algebra utilities.
//!
//! Dense solves for the Broyden iteration and the tridiagonal solver used
//! to cross-check spline second derivatives.

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};

/// Smallest pivot magnitude accepted by [`solve_tridiagonal`].
const MIN_PIVOT: f64 = 1e-300;

/// Solves `M x = d` for tridiagonal `M` by the Thomas sweep.
///
/// `lower` and `upper` hold the sub- and super-diagonal (`n - 1` entries
/// each), `diag` the main diagonal and `d` the right-hand side (`n` each).
/// No pivoting is done, so a vanishing pivot is reported as
/// [`MathError::SingularMatrix`] even when the system is solvable.
pub fn solve_tridiagonal(
    lower: &[f64],
    diag: &[f64],
    upper: &[f64],
    d: &[f64],
) -> MathResult<Vec<f64>> {
    let n = diag.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    if lower.len() + 1 != n || upper.len() + 1 != n || d.len() != n {
        return Err(MathError::invalid_input(format!(
            "order {n} tridiagonal system needs {} off-diagonal and {n} rhs entries",
            n - 1
        )));
    }

    // Sweep down, keeping the scaled super-diagonal and right-hand side.
    let mut sweep: Vec<(f64, f64)> = Vec::with_capacity(n);
    for i in 0..n {
        let (prev_upper, prev_rhs) = if i == 0 {
            (0.0, 0.0)
        } else {
            sweep[i - 1]
        };
        let sub = if i == 0 { 0.0 } else { lower[i - 1] };
        let pivot = diag[i] - sub * prev_upper;
        if pivot.abs() < MIN_PIVOT {
            return Err(MathError::SingularMatrix);
        }
        let scaled_upper = upper.get(i).map_or(0.0, |u| u / pivot);
        sweep.push((scaled_upper, (d[i] - sub * prev_rhs) / pivot));
    }

    let mut x = vec![0.0; n];
    let mut next = 0.0;
    for (xi, &(scaled_upper, rhs)) in x.iter_mut().zip(&sweep).rev() {
        *xi = rhs - scaled_upper * next;
        next = *xi;
    }
    Ok(x)
}

/// Solves the dense system `A x = b` by LU decomposition with partial pivoting.
///
/// A singular matrix, or one so badly conditioned that the solution is not
/// finite, is reported as [`MathError::SingularMatrix`].
pub fn solve_linear_system(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(MathError::invalid_input(format!(
            "cannot solve a {n}x{} system",
            a.ncols()
        )));
    }
    if n != b.len() {
        return Err(MathError::vector_mismatch(n, b.len()));
    }

    let x = a.clone().lu().solve(b).ok_or(MathError::SingularMatrix)?;
    if x.iter().any(|v| !v.is_finite()) {
        return Err(MathError::SingularMatrix);
    }
    Ok(x)
}

/// Returns the largest absolute entry, or zero for an empty slice.
///
/// A `NaN` entry makes the norm `NaN`.
#[must_use]
pub fn infinity_norm(values: &[f64]) -> f64 {
    values.iter().fold(0.0_f64, |acc, v| {
        if acc.is_nan() || v.is_nan() {
            f64::NAN
        } else {
            acc.max(v.abs())
        }
    })
}
