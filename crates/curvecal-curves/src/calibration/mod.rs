//! Curve calibration against instrument residuals.
//!
//! A [`PricingFunction`] prices one instrument off a [`CurveAdjuster`] and
//! returns its residual against the market quote. [`CalibrationObjective`]
//! turns an adjuster plus one pricing function per calibration date into a
//! [`VectorFunction`], and [`CurveCalibrator`] solves it with Broyden's
//! method.
//!
//! # Example
//!
//! ```rust
//! use curvecal_curves::prelude::*;
//!
//! /// Residual of a zero rate quote read straight off the discount curve.
//! struct ZeroQuote {
//!     date: f64,
//!     quote: f64,
//! }
//!
//! impl PricingFunction for ZeroQuote {
//!     fn value(&self, adjuster: &CurveAdjuster) -> CurveResult<f64> {
//!         Ok(adjuster.discount_curve().interpolate(self.date)? - self.quote)
//!     }
//!
//!     fn curve_date(&self) -> f64 {
//!         self.date
//!     }
//! }
//!
//! let (val, horizon) = (44287.0, 44287.0 + 3650.0);
//! let seed = Curve::new(vec![val, horizon], vec![0.02, 0.02], InterpolationMethod::LinearZero)
//!     .unwrap();
//! let params = CurveAdjusterParams::new(
//!     "USD-SOFR",
//!     vec![],
//!     vec![],
//!     vec![val + 365.0, val + 1825.0],
//!     InterpolationMethod::LinearZero,
//! )
//! .unwrap();
//! let mut adjuster = CurveAdjuster::builder(val, horizon)
//!     .anchor(seed, params)
//!     .build()
//!     .unwrap();
//!
//! let quotes: Vec<Box<dyn PricingFunction>> = vec![
//!     Box::new(ZeroQuote { date: val + 1825.0, quote: 0.03 }),
//!     Box::new(ZeroQuote { date: val + 365.0, quote: 0.025 }),
//! ];
//!
//! let mut calibrator = CurveCalibrator::default();
//! let result = calibrator.calibrate(&mut adjuster, &quotes, &[]).unwrap();
//! assert!(result.max_error <= 1e-10);
//! ```

use log::{debug, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use curvecal_math::solvers::{BroydenConfig, BroydenSolver, VectorFunction};

use crate::adjuster::CurveAdjuster;
use crate::error::{CurveError, CurveResult};

/// Prices one calibration instrument off the adjuster's curves.
pub trait PricingFunction {
    /// Model value minus market quote.
    fn value(&self, adjuster: &CurveAdjuster) -> CurveResult<f64>;

    /// Maturity the instrument calibrates, as a day serial.
    fn curve_date(&self) -> f64;
}

/// Residuals of the adjuster's instruments as a function of the adjustment
/// vector.
///
/// Anchor functions come first, then basis functions, each group sorted by
/// [`curve_date`](PricingFunction::curve_date) to line up with the
/// adjuster's vector layout.
pub struct CalibrationObjective<'a> {
    adjuster: &'a mut CurveAdjuster,
    functions: Vec<&'a dyn PricingFunction>,
}

impl<'a> CalibrationObjective<'a> {
    /// Wraps `adjuster` with its pricing functions.
    ///
    /// # Errors
    ///
    /// `Configuration` when a group's size differs from the number of
    /// calibration dates on its leg.
    pub fn new(
        adjuster: &'a mut CurveAdjuster,
        anchor_functions: &'a [Box<dyn PricingFunction>],
        basis_functions: &'a [Box<dyn PricingFunction>],
    ) -> CurveResult<Self> {
        let expected = [
            ("anchor", adjuster.anchor_params(), anchor_functions.len()),
            ("basis", adjuster.basis_params(), basis_functions.len()),
        ];
        for (leg, params, actual) in expected {
            if params.num_total_points() != actual {
                return Err(CurveError::configuration(format!(
                    "{}: {actual} {leg} pricing functions for {} calibration dates",
                    params.index(),
                    params.num_total_points()
                )));
            }
        }

        let mut functions = sorted(anchor_functions);
        functions.extend(sorted(basis_functions));
        Ok(Self {
            adjuster,
            functions,
        })
    }

    /// The wrapped adjuster.
    pub fn adjuster(&self) -> &CurveAdjuster {
        &*self.adjuster
    }
}

fn sorted(functions: &[Box<dyn PricingFunction>]) -> Vec<&dyn PricingFunction> {
    let mut refs: Vec<&dyn PricingFunction> = functions.iter().map(|f| f.as_ref()).collect();
    refs.sort_by(|a, b| a.curve_date().total_cmp(&b.curve_date()));
    refs
}

impl VectorFunction for CalibrationObjective<'_> {
    type Error = CurveError;

    fn dimension(&self) -> usize {
        self.functions.len()
    }

    /// Applies `x` on top of the adjuster's snapshot and prices every
    /// instrument.
    fn value(&mut self, x: &[f64]) -> CurveResult<Vec<f64>> {
        self.adjuster.adjust_curves(x)?;
        let adjuster = &*self.adjuster;
        self.functions.iter().map(|f| f.value(adjuster)).collect()
    }
}

/// Calibration settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Root solver settings.
    pub solver: BroydenConfig,
    /// Polish a kept Jacobian before reusing it.
    pub polish: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            solver: BroydenConfig::default(),
            polish: true,
        }
    }
}

impl CalibrationConfig {
    /// Creates a configuration with the given solver settings.
    #[must_use]
    pub fn new(solver: BroydenConfig) -> Self {
        Self {
            solver,
            ..Self::default()
        }
    }

    /// Sets the solver settings.
    #[must_use]
    pub fn with_solver(mut self, solver: BroydenConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Turns Jacobian polishing on or off.
    #[must_use]
    pub fn with_polish(mut self, polish: bool) -> Self {
        self.polish = polish;
        self
    }
}

/// Result of a calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    /// Residual of each instrument at the solution, anchor then basis.
    pub residuals: Vec<f64>,
    /// Broyden iterations used.
    pub iterations: u32,
    /// Largest absolute residual.
    pub max_error: f64,
}

impl CalibrationResult {
    /// Returns residuals in basis points.
    #[must_use]
    pub fn errors_bps(&self) -> Vec<f64> {
        self.residuals.iter().map(|r| r * 10_000.0).collect()
    }

    /// One-line summary of the calibration.
    pub fn summary(&self) -> String {
        format!(
            "Calibration converged: {} instruments, {} iterations, Max={:.4}bp",
            self.residuals.len(),
            self.iterations,
            self.max_error * 10_000.0
        )
    }
}

/// Calibrates adjusters with a Broyden solver that keeps its Jacobian.
///
/// The first calibration builds the Jacobian by finite differences. Later
/// ones on an adjuster of the same dimension start from the kept Jacobian,
/// polished first unless the configuration says otherwise.
#[derive(Debug, Clone, Default)]
pub struct CurveCalibrator {
    config: CalibrationConfig,
    solver: BroydenSolver,
}

impl CurveCalibrator {
    /// Creates a calibrator.
    #[must_use]
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            solver: BroydenSolver::new(config.solver),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// The Jacobian kept from the last calibration, if any.
    pub fn jacobian(&self) -> Option<&DMatrix<f64>> {
        self.solver.jacobian()
    }

    /// Forgets the kept Jacobian.
    pub fn reset(&mut self) {
        self.solver.reset_jacobian();
    }

    /// Finds the adjustment that zeroes every residual, applies it and
    /// accepts the result as the adjuster's new snapshot.
    ///
    /// The solve starts from a zero adjustment, i.e. the current snapshot.
    /// On failure the adjuster is restored to that snapshot.
    ///
    /// # Errors
    ///
    /// - `Configuration` for mismatched pricing functions.
    /// - `ConvergenceFailure` when the solver hits its iteration cap.
    /// - `Math(NonFiniteValue)` when a pricing function returns `NaN` or an
    ///   infinity.
    /// - Any error raised by a pricing function or by the curves.
    pub fn calibrate(
        &mut self,
        adjuster: &mut CurveAdjuster,
        anchor_functions: &[Box<dyn PricingFunction>],
        basis_functions: &[Box<dyn PricingFunction>],
    ) -> CurveResult<CalibrationResult> {
        let outcome = {
            let mut objective =
                CalibrationObjective::new(adjuster, anchor_functions, basis_functions)?;
            let guess = vec![0.0; objective.dimension()];
            self.solver
                .solve_with_polish(&mut objective, &guess, self.config.polish)
        };

        let solution = match outcome {
            Ok(solution) => solution,
            Err(err) => {
                warn!(
                    "Calibration of {}/{} failed: {err}",
                    adjuster.anchor_params().index(),
                    adjuster.basis_params().index()
                );
                adjuster.restore_curves()?;
                return Err(err);
            }
        };

        adjuster.adjust_curves(&solution.root)?;
        adjuster.accept_curves();

        let result = CalibrationResult {
            residuals: solution.residuals,
            iterations: solution.iterations,
            max_error: solution.residual_norm,
        };
        debug!("{}", result.summary());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjuster::{AdjusterState, CurveAdjusterParams};
    use crate::curve::Curve;
    use crate::interpolation::InterpolationMethod;
    use approx::assert_relative_eq;

    const VAL: f64 = 44287.0;
    const MAX: f64 = VAL + 3650.0;

    struct ZeroQuote {
        date: f64,
        quote: f64,
    }

    impl ZeroQuote {
        fn boxed(date: f64, quote: f64) -> Box<dyn PricingFunction> {
            Box::new(Self { date, quote })
        }
    }

    impl PricingFunction for ZeroQuote {
        fn value(&self, adjuster: &CurveAdjuster) -> CurveResult<f64> {
            Ok(adjuster.discount_curve().interpolate(self.date)? - self.quote)
        }

        fn curve_date(&self) -> f64 {
            self.date
        }
    }

    /// Prices fine until the short knot moves, then breaks down.
    struct Fragile;

    impl PricingFunction for Fragile {
        fn value(&self, adjuster: &CurveAdjuster) -> CurveResult<f64> {
            let rate = adjuster.discount_curve().interpolate(VAL + 91.0)?;
            Ok(if rate == 0.02 { rate - 0.015 } else { f64::NAN })
        }

        fn curve_date(&self) -> f64 {
            VAL + 91.0
        }
    }

    fn adjuster() -> CurveAdjuster {
        let seed = Curve::new(
            vec![VAL, MAX],
            vec![0.02, 0.02],
            InterpolationMethod::LinearZero,
        )
        .unwrap();
        let params = CurveAdjusterParams::new(
            "USD-SOFR",
            vec![VAL + 91.0],
            vec![VAL + 365.0],
            vec![VAL + 1825.0],
            InterpolationMethod::LinearZero,
        )
        .unwrap();
        CurveAdjuster::builder(VAL, MAX)
            .anchor(seed, params)
            .build()
            .unwrap()
    }

    fn quotes() -> Vec<Box<dyn PricingFunction>> {
        // Deliberately out of maturity order.
        vec![
            ZeroQuote::boxed(VAL + 1825.0, 0.031),
            ZeroQuote::boxed(VAL + 91.0, 0.015),
            ZeroQuote::boxed(VAL + 365.0, 0.022),
        ]
    }

    #[test]
    fn test_objective_orders_by_curve_date() {
        let mut adj = adjuster();
        let fns = quotes();
        let mut objective = CalibrationObjective::new(&mut adj, &fns, &[]).unwrap();

        assert_eq!(objective.dimension(), 3);
        let values = objective.value(&[0.0; 3]).unwrap();
        assert_relative_eq!(values[0], 0.02 - 0.015, epsilon = 1e-15);
        assert_relative_eq!(values[1], 0.02 - 0.022, epsilon = 1e-15);
        assert_relative_eq!(values[2], 0.02 - 0.031, epsilon = 1e-15);

        let values = objective.value(&[0.001, 0.0, 0.0]).unwrap();
        assert_relative_eq!(values[0], 0.021 - 0.015, epsilon = 1e-15);
        assert_eq!(objective.adjuster().state(), AdjusterState::Calibrating);
    }

    #[test]
    fn test_objective_checks_counts() {
        let mut adj = adjuster();
        let fns = quotes();
        let err = CalibrationObjective::new(&mut adj, &fns[..2], &[]).err().unwrap();
        assert!(err.is_engine());
        assert!(err.to_string().contains("anchor"));
    }

    #[test]
    fn test_calibrate_accepts_solution() {
        let mut adj = adjuster();
        let fns = quotes();
        let mut calibrator = CurveCalibrator::default();

        let result = calibrator.calibrate(&mut adj, &fns, &[]).unwrap();
        assert!(result.max_error <= 1e-10);
        assert_eq!(result.residuals.len(), 3);
        assert_eq!(adj.state(), AdjusterState::Accepted);
        assert!(calibrator.jacobian().is_some());

        let curve = adj.discount_curve();
        assert_relative_eq!(curve.interpolate(VAL + 365.0).unwrap(), 0.022, epsilon = 1e-10);

        // The accepted curves are the new starting point.
        adj.restore_curves().unwrap();
        assert_relative_eq!(
            adj.discount_curve().interpolate(VAL + 1825.0).unwrap(),
            0.031,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_recalibration_reuses_jacobian() {
        let mut adj = adjuster();
        let fns = quotes();
        let mut calibrator = CurveCalibrator::new(CalibrationConfig::default().with_polish(false));
        calibrator.calibrate(&mut adj, &fns, &[]).unwrap();

        // Already calibrated: no Jacobian build, no steps.
        let result = calibrator.calibrate(&mut adj, &fns, &[]).unwrap();
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_failed_calibration_restores_snapshot() {
        let mut adj = adjuster();
        let before = adj.anchor_curve().clone();
        let fns = quotes();
        let config =
            CalibrationConfig::new(BroydenConfig::default().with_max_iterations(0));
        let mut calibrator = CurveCalibrator::new(config);

        let err = calibrator.calibrate(&mut adj, &fns, &[]).unwrap_err();
        assert!(err.is_convergence());
        assert_eq!(adj.anchor_curve(), &before);
        assert_eq!(adj.state(), AdjusterState::Seeded);
    }

    #[test]
    fn test_nan_residual_fails_calibration() {
        let mut adj = adjuster();
        let before = adj.anchor_curve().clone();
        let mut fns = quotes();
        fns[1] = Box::new(Fragile);

        let mut calibrator = CurveCalibrator::default();
        let err = calibrator.calibrate(&mut adj, &fns, &[]).unwrap_err();

        assert!(err.is_convergence());
        assert!(matches!(err, CurveError::Math(_)));
        assert_eq!(adj.state(), AdjusterState::Seeded);
        assert_eq!(adj.anchor_curve(), &before);
    }

    #[test]
    fn test_result_reporting() {
        let result = CalibrationResult {
            residuals: vec![1e-5, -2e-5],
            iterations: 4,
            max_error: 2e-5,
        };
        assert_relative_eq!(result.errors_bps()[1], -0.2, epsilon = 1e-12);
        let summary = result.summary();
        assert!(summary.contains("2 instruments"));
        assert!(summary.contains("4 iterations"));
    }
}
