//! Broyden's quasi-Newton method.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{BroydenConfig, VectorFunction};
use crate::error::MathError;
use crate::linear_algebra::{infinity_norm, solve_linear_system};

/// Outcome of a successful Broyden solve.
#[derive(Debug, Clone, PartialEq)]
pub struct BroydenResult {
    /// The root found.
    pub root: Vec<f64>,
    /// Function value at the root.
    pub residuals: Vec<f64>,
    /// Number of Broyden steps taken.
    pub iterations: u32,
    /// Infinity norm of `residuals`.
    pub residual_norm: f64,
}

/// Broyden root finder with a reusable Jacobian.
///
/// The solver owns its Jacobian approximation between calls. The first
/// [`solve`](Self::solve) builds it by forward differences. Later calls
/// polish the existing one, unless the function dimension changed, in which
/// case it is rebuilt.
#[derive(Debug, Clone)]
pub struct BroydenSolver {
    config: BroydenConfig,
    jacobian: Option<DMatrix<f64>>,
    rng: StdRng,
    iterations: u32,
}

impl Default for BroydenSolver {
    fn default() -> Self {
        Self::new(BroydenConfig::default())
    }
}

impl BroydenSolver {
    /// Creates a solver with no Jacobian.
    #[must_use]
    pub fn new(config: BroydenConfig) -> Self {
        Self {
            config,
            jacobian: None,
            rng: StdRng::seed_from_u64(config.seed),
            iterations: 0,
        }
    }

    /// Starts from a known Jacobian, for example one kept from an earlier run.
    #[must_use]
    pub fn with_jacobian(mut self, jacobian: DMatrix<f64>) -> Self {
        self.jacobian = Some(jacobian);
        self
    }

    /// Returns the solver configuration.
    pub fn config(&self) -> &BroydenConfig {
        &self.config
    }

    /// Returns the current Jacobian approximation, if any.
    pub fn jacobian(&self) -> Option<&DMatrix<f64>> {
        self.jacobian.as_ref()
    }

    /// Drops the Jacobian so the next solve rebuilds it.
    pub fn reset_jacobian(&mut self) {
        self.jacobian = None;
    }

    /// Number of iterations taken by the last solve.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Builds a forward-difference Jacobian at `x`.
    ///
    /// Costs `dimension + 1` evaluations of `f`.
    pub fn build_jacobian<F: VectorFunction>(
        &mut self,
        f: &mut F,
        x: &[f64],
    ) -> Result<(), F::Error> {
        let dim = f.dimension();
        check_len(dim, x.len())?;

        let bump = self.config.bump;
        let base = evaluate(f, x)?;
        let mut jacobian = DMatrix::zeros(dim, dim);
        let mut bumped = x.to_vec();

        for j in 0..dim {
            bumped[j] += bump;
            let shifted = evaluate(f, &bumped)?;
            bumped[j] = x[j];

            for i in 0..dim {
                jacobian[(i, j)] = (shifted[i] - base[i]) / bump;
            }
        }

        debug!("Built {dim}x{dim} Jacobian by forward differences");
        self.jacobian = Some(jacobian);
        Ok(())
    }

    /// Refines an existing Jacobian with one random secant step.
    ///
    /// The step direction is the first column of the Q factor of a random matrix,
    /// scaled to the bump. When the actual change in `f` differs from the
    /// predicted one by at least `polish_threshold * bump`, a single rank-1
    /// correction is applied. Returns whether the Jacobian changed.
    ///
    /// Builds a fresh Jacobian when none exists yet.
    pub fn polish_jacobian<F: VectorFunction>(
        &mut self,
        f: &mut F,
        guess: &[f64],
    ) -> Result<bool, F::Error> {
        let dim = f.dimension();
        check_len(dim, guess.len())?;

        let mut jacobian = match self.jacobian.take() {
            Some(j) if j.nrows() == dim && j.ncols() == dim => j,
            _ => {
                self.build_jacobian(f, guess)?;
                return Ok(true);
            }
        };
        if dim == 0 {
            self.jacobian = Some(jacobian);
            return Ok(false);
        }

        let rng = &mut self.rng;
        let random = DMatrix::from_fn(dim, dim, |_, _| rng.gen::<f64>());
        let q = random.qr().q();
        let dx: DVector<f64> = q.column(0).into_owned() * self.config.bump;

        let x = DVector::from_column_slice(guess);
        let trial = &x + &dx;

        let f0 = DVector::from_vec(evaluate(f, guess)?);
        let f1 = DVector::from_vec(evaluate(f, trial.as_slice())?);
        let diff = (f1 - f0) - &jacobian * &dx;

        let threshold = self.config.polish_threshold * self.config.bump;
        if diff.norm() < threshold {
            debug!(
                "Jacobian polish skipped: mismatch {:.3e} below {:.3e}",
                diff.norm(),
                threshold
            );
            self.jacobian = Some(jacobian);
            return Ok(false);
        }

        warn!(
            "Jacobian polish applied: mismatch {:.3e} exceeds {:.3e}",
            diff.norm(),
            threshold
        );
        rank_one_update(&mut jacobian, &diff, &dx);
        self.jacobian = Some(jacobian);
        Ok(true)
    }

    /// Solves `f(x) = 0` from `guess`, polishing any existing Jacobian.
    pub fn solve<F: VectorFunction>(
        &mut self,
        f: &mut F,
        guess: &[f64],
    ) -> Result<BroydenResult, F::Error> {
        self.solve_with_polish(f, guess, true)
    }

    /// Solves `f(x) = 0` from `guess`.
    ///
    /// Without a Jacobian one is built first. With one, `polish` decides
    /// whether it is refined before iterating. Exceeding `max_iterations`
    /// is an error; no partial result is returned.
    pub fn solve_with_polish<F: VectorFunction>(
        &mut self,
        f: &mut F,
        guess: &[f64],
        polish: bool,
    ) -> Result<BroydenResult, F::Error> {
        let dim = f.dimension();
        check_len(dim, guess.len())?;

        let stale = self
            .jacobian
            .as_ref()
            .map_or(true, |j| j.nrows() != dim || j.ncols() != dim);
        if stale {
            self.build_jacobian(f, guess)?;
        } else if polish {
            self.polish_jacobian(f, guess)?;
        }

        let mut jacobian = self
            .jacobian
            .take()
            .ok_or_else(|| MathError::invalid_input("Jacobian missing after build"))?;

        let outcome = self.iterate(f, &mut jacobian, guess);
        if jacobian.iter().all(|v| v.is_finite()) {
            self.jacobian = Some(jacobian);
        }
        outcome
    }

    /// Runs Broyden steps from `guess`, updating `jacobian` in place.
    fn iterate<F: VectorFunction>(
        &mut self,
        f: &mut F,
        jacobian: &mut DMatrix<f64>,
        guess: &[f64],
    ) -> Result<BroydenResult, F::Error> {
        let mut x = DVector::from_column_slice(guess);
        let mut fx = DVector::from_vec(evaluate(f, guess)?);
        self.iterations = 0;

        loop {
            let norm = infinity_norm(fx.as_slice());
            debug!("Broyden iteration {}: residual {norm:.3e}", self.iterations);

            if norm <= self.config.tolerance {
                break;
            }
            if self.iterations >= self.config.max_iterations {
                warn!(
                    "Broyden failed after {} iterations (residual {norm:.3e})",
                    self.iterations
                );
                return Err(MathError::convergence_failed(self.iterations, norm).into());
            }

            let rhs = -fx.clone();
            let dx = solve_linear_system(jacobian, &rhs)?;

            x += &dx;
            let next = DVector::from_vec(evaluate(f, x.as_slice())?);
            let diff = (&next - &fx) - &*jacobian * &dx;
            rank_one_update(jacobian, &diff, &dx);

            fx = next;
            self.iterations += 1;
        }

        let residual_norm = infinity_norm(fx.as_slice());
        debug!(
            "Broyden converged in {} iterations (residual {residual_norm:.3e})",
            self.iterations
        );

        Ok(BroydenResult {
            root: x.as_slice().to_vec(),
            residuals: fx.as_slice().to_vec(),
            iterations: self.iterations,
            residual_norm,
        })
    }
}

/// Applies `J += (diff ⊗ dx) / ‖dx‖²`, leaving `J` alone for a zero step.
fn rank_one_update(jacobian: &mut DMatrix<f64>, diff: &DVector<f64>, dx: &DVector<f64>) {
    let dx_norm_sq = dx.norm_squared();
    if dx_norm_sq == 0.0 {
        return;
    }
    *jacobian += diff * dx.transpose() * (1.0 / dx_norm_sq);
}

/// Evaluates `f` and checks the output is complete and finite.
fn evaluate<F: VectorFunction>(f: &mut F, x: &[f64]) -> Result<Vec<f64>, F::Error> {
    let values = f.value(x)?;
    check_len(f.dimension(), values.len())?;
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        warn!("Function value {index} is not finite");
        return Err(MathError::NonFiniteValue { index }.into());
    }
    Ok(values)
}

fn check_len(expected: usize, actual: usize) -> Result<(), MathError> {
    if expected == actual {
        Ok(())
    } else {
        Err(MathError::vector_mismatch(expected, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// F(x) = A x - b
    struct Linear {
        a: DMatrix<f64>,
        b: DVector<f64>,
        calls: usize,
    }

    impl Linear {
        fn new(a: DMatrix<f64>, b: DVector<f64>) -> Self {
            Self { a, b, calls: 0 }
        }
    }

    impl VectorFunction for Linear {
        type Error = MathError;

        fn dimension(&self) -> usize {
            self.b.len()
        }

        fn value(&mut self, x: &[f64]) -> Result<Vec<f64>, MathError> {
            self.calls += 1;
            let x = DVector::from_column_slice(x);
            Ok((&self.a * x - &self.b).as_slice().to_vec())
        }
    }

    /// x^2 + y^2 = 4, x - y = 0
    struct Circle;

    impl VectorFunction for Circle {
        type Error = MathError;

        fn dimension(&self) -> usize {
            2
        }

        fn value(&mut self, x: &[f64]) -> Result<Vec<f64>, MathError> {
            Ok(vec![x[0] * x[0] + x[1] * x[1] - 4.0, x[0] - x[1]])
        }
    }

    /// Breaks down on its second component.
    struct Broken {
        value: f64,
    }

    impl VectorFunction for Broken {
        type Error = MathError;

        fn dimension(&self) -> usize {
            2
        }

        fn value(&mut self, x: &[f64]) -> Result<Vec<f64>, MathError> {
            Ok(vec![x[0], self.value])
        }
    }

    /// x - 1, undefined past x = 0.5.
    struct Cliff;

    impl VectorFunction for Cliff {
        type Error = MathError;

        fn dimension(&self) -> usize {
            1
        }

        fn value(&mut self, x: &[f64]) -> Result<Vec<f64>, MathError> {
            Ok(vec![if x[0] > 0.5 { f64::NAN } else { x[0] - 1.0 }])
        }
    }

    /// Never has a root.
    struct Offset;

    impl VectorFunction for Offset {
        type Error = MathError;

        fn dimension(&self) -> usize {
            1
        }

        fn value(&mut self, x: &[f64]) -> Result<Vec<f64>, MathError> {
            Ok(vec![x[0] * x[0] + 1.0])
        }
    }

    fn system() -> Linear {
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[4.0, 1.0, 0.5, 1.0, 3.0, -0.5, 0.5, -0.5, 2.0],
        );
        let b = DVector::from_vec(vec![1.0, -2.0, 0.5]);
        Linear::new(a, b)
    }

    #[test]
    fn test_linear_system_converges_quickly() {
        let mut f = system();
        let expected = f.a.clone().lu().solve(&f.b).unwrap();

        let mut solver = BroydenSolver::default();
        let result = solver.solve(&mut f, &[0.0, 0.0, 0.0]).unwrap();

        assert!(result.iterations <= 4);
        assert!(result.residual_norm <= 1e-10);
        for i in 0..3 {
            assert_relative_eq!(result.root[i], expected[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_jacobian_matches_linear_map() {
        let mut f = system();
        let mut solver = BroydenSolver::default();
        solver.build_jacobian(&mut f, &[0.1, 0.2, 0.3]).unwrap();

        // dimension + 1 evaluations
        assert_eq!(f.calls, 4);
        let j = solver.jacobian().unwrap();
        for r in 0..3 {
            for c in 0..3 {
                assert_relative_eq!(j[(r, c)], f.a[(r, c)], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_nonlinear_system() {
        let mut solver = BroydenSolver::default();
        let result = solver.solve(&mut Circle, &[1.0, 1.5]).unwrap();

        let root = std::f64::consts::SQRT_2;
        assert_relative_eq!(result.root[0], root, epsilon = 1e-8);
        assert_relative_eq!(result.root[1], root, epsilon = 1e-8);
    }

    #[test]
    fn test_iteration_cap_is_fatal() {
        let mut solver = BroydenSolver::new(BroydenConfig::default().with_max_iterations(5));
        let err = solver.solve(&mut Offset, &[1.0]).unwrap_err();

        match err {
            MathError::ConvergenceFailed { iterations, .. } => assert_eq!(iterations, 5),
            MathError::SingularMatrix => {}
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nan_residual_is_not_a_root() {
        let mut solver = BroydenSolver::default();
        let err = solver
            .solve(&mut Broken { value: f64::NAN }, &[0.0, 0.0])
            .unwrap_err();
        assert_eq!(err, MathError::NonFiniteValue { index: 1 });

        let err = solver
            .solve(&mut Broken { value: f64::INFINITY }, &[0.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, MathError::NonFiniteValue { index: 1 }));
        assert!(solver.jacobian().is_none());
    }

    #[test]
    fn test_nan_mid_solve_is_an_error() {
        let mut solver = BroydenSolver::default();
        let err = solver.solve(&mut Cliff, &[0.0]).unwrap_err();

        assert_eq!(err, MathError::NonFiniteValue { index: 0 });
        assert!(solver.jacobian().unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_polish_leaves_exact_jacobian_alone() {
        let mut f = system();
        let mut solver = BroydenSolver::default().with_jacobian(f.a.clone());

        let changed = solver.polish_jacobian(&mut f, &[0.0, 0.0, 0.0]).unwrap();
        assert!(!changed);
        assert_eq!(solver.jacobian().unwrap(), &f.a);
    }

    #[test]
    fn test_polish_corrects_bad_jacobian() {
        let mut f = system();
        let bad = DMatrix::<f64>::identity(3, 3) * 100.0;
        let mut solver = BroydenSolver::default().with_jacobian(bad.clone());

        let changed = solver.polish_jacobian(&mut f, &[0.0, 0.0, 0.0]).unwrap();
        assert!(changed);
        assert_ne!(solver.jacobian().unwrap(), &bad);
    }

    #[test]
    fn test_second_solve_reuses_jacobian() {
        let mut f = system();
        let mut solver = BroydenSolver::default();
        let first = solver.solve(&mut f, &[0.0, 0.0, 0.0]).unwrap();

        // Restart from the root: polish costs two evaluations, then the
        // initial residual check finds it converged.
        f.calls = 0;
        let second = solver.solve(&mut f, &first.root).unwrap();
        assert_eq!(second.iterations, 0);
        assert_eq!(f.calls, 3);
    }

    #[test]
    fn test_solve_without_polish_skips_secant_step() {
        let mut f = system();
        let mut solver = BroydenSolver::default().with_jacobian(f.a.clone());

        let result = solver.solve_with_polish(&mut f, &[0.0, 0.0, 0.0], false).unwrap();
        assert!(result.iterations <= 2);
        // One initial evaluation plus one per iteration.
        assert_eq!(f.calls, 1 + result.iterations as usize);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut f = system();
        let mut solver = BroydenSolver::default();
        assert!(matches!(
            solver.solve(&mut f, &[0.0, 0.0]),
            Err(MathError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_stale_jacobian_rebuilt() {
        let mut f = system();
        let mut solver = BroydenSolver::default().with_jacobian(DMatrix::identity(2, 2));
        let result = solver.solve(&mut f, &[0.0, 0.0, 0.0]).unwrap();

        assert!(result.residual_norm <= 1e-10);
        assert_eq!(solver.jacobian().unwrap().nrows(), 3);
    }
}
