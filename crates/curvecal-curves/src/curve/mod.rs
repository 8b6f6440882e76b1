//! Knot curves.
//!
//! A [`Curve`] is an ordered set of `(x, y)` knots plus one interpolator.
//! Abscissas are day serials; values are usually zero rates, but any value
//! works with the linear zero and cubic spline methods.
//!
//! Queries on a knot return the stored value exactly. Queries between knots
//! go to the interpolator with the bracket already located. Queries strictly
//! outside `[x[0], x[n-1]]` fail with an extrapolation error tagged by side.
//!
//! # Example
//!
//! ```rust
//! use curvecal_curves::prelude::*;
//!
//! let curve = Curve::new(
//!     vec![44287.0, 44652.0, 45017.0],
//!     vec![0.010, 0.015, 0.020],
//!     InterpolationMethod::LinearZero,
//! )
//! .unwrap();
//!
//! assert!((curve.interpolate(44469.5).unwrap() - 0.0125).abs() < 1e-12);
//! assert!(curve.interpolate(46000.0).unwrap_err().is_extrapolation());
//! ```

mod interpolator;

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use curvecal_math::interpolation::{BracketInterpolator, DAYS_PER_YEAR};

use crate::dates::serial_from_date;
use crate::error::{CurveError, CurveResult};
use crate::interpolation::InterpolationMethod;

pub(crate) use interpolator::CurveInterpolator;

/// An interpolated knot curve.
#[derive(Debug, Clone)]
pub struct Curve {
    x: Vec<f64>,
    y: Vec<f64>,
    method: InterpolationMethod,
    interpolator: CurveInterpolator,
}

impl Curve {
    /// Creates a curve and initializes its interpolator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCurve` if the lengths differ, there are fewer than
    /// two knots, or `x` is not strictly ascending.
    pub fn new(x: Vec<f64>, y: Vec<f64>, method: InterpolationMethod) -> CurveResult<Self> {
        if x.len() != y.len() {
            return Err(CurveError::invalid_curve(format!(
                "x and y vectors must have the same length: {} != {}",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(CurveError::invalid_curve(format!(
                "a curve needs at least 2 knots, got {}",
                x.len()
            )));
        }
        if let Some(i) = x
            .windows(2)
            .position(|w| w[0].partial_cmp(&w[1]) != Some(Ordering::Less))
        {
            return Err(CurveError::invalid_curve(format!(
                "x values must be strictly ascending: x[{i}] = {} and x[{}] = {}",
                x[i],
                i + 1,
                x[i + 1]
            )));
        }

        let mut curve = Self {
            x,
            y,
            method,
            interpolator: CurveInterpolator::for_method(method),
        };
        curve.update()?;
        Ok(curve)
    }

    /// Returns the knot abscissas.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Returns the knot values.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Returns the interpolation method.
    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always false; a curve has at least two knots.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// First knot.
    pub fn min_x(&self) -> f64 {
        self.x[0]
    }

    /// Last knot.
    pub fn max_x(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// Last knot value.
    pub fn last_y(&self) -> f64 {
        self.y[self.y.len() - 1]
    }

    /// Interpolates at `ax`.
    ///
    /// # Errors
    ///
    /// `ExtrapolationOutOfRange` outside `[min_x, max_x]`; `InvalidCurve` for
    /// a `NaN` query.
    pub fn interpolate(&self, ax: f64) -> CurveResult<f64> {
        if ax.is_nan() {
            return Err(CurveError::invalid_curve("cannot interpolate at NaN"));
        }

        match self.x.binary_search_by(|knot| knot.total_cmp(&ax)) {
            Ok(i) => Ok(self.y[i]),
            Err(0) => Err(CurveError::extrapolation(ax, self.min_x(), self.max_x())),
            Err(i) if i == self.x.len() => {
                Err(CurveError::extrapolation(ax, self.min_x(), self.max_x()))
            }
            Err(i) => Ok(self.interpolator.interpolate(&self.x, &self.y, i - 1, ax)?),
        }
    }

    /// Interpolates every point in `ax`, stopping at the first failure.
    pub fn interpolate_array(&self, ax: &[f64]) -> CurveResult<Vec<f64>> {
        ax.iter().map(|&x| self.interpolate(x)).collect()
    }

    /// Interpolates at a calendar date.
    pub fn interpolate_date(&self, date: NaiveDate) -> CurveResult<f64> {
        self.interpolate(serial_from_date(date))
    }

    /// Year fraction of `ax` from the first knot, on an ACT/365 basis.
    ///
    /// # Errors
    ///
    /// `InvalidCurve` when `ax` precedes the first knot.
    pub fn year_fraction(&self, ax: f64) -> CurveResult<f64> {
        let t = (ax - self.min_x()) / DAYS_PER_YEAR;
        if t < 0.0 {
            return Err(CurveError::invalid_curve(format!("invalid year fraction {t}")));
        }
        Ok(t)
    }

    /// Discount factor `exp(-r(ax) t(ax))`, treating values as zero rates.
    pub fn discount_factor(&self, ax: f64) -> CurveResult<f64> {
        let t = self.year_fraction(ax)?;
        Ok((-self.interpolate(ax)? * t).exp())
    }

    /// Discount factor at a calendar date.
    pub fn discount_factor_date(&self, date: NaiveDate) -> CurveResult<f64> {
        self.discount_factor(serial_from_date(date))
    }

    /// Replaces all values and rebuilds the interpolator.
    ///
    /// # Errors
    ///
    /// `InvalidCurve` when the length changes.
    pub fn set_y(&mut self, y: &[f64]) -> CurveResult<()> {
        if y.len() != self.y.len() {
            return Err(CurveError::invalid_curve(format!(
                "cannot change curve length from {} to {}",
                self.y.len(),
                y.len()
            )));
        }
        self.y.copy_from_slice(y);
        self.update()
    }

    /// Rebuilds the interpolator from the current knots.
    pub fn update(&mut self) -> CurveResult<()> {
        self.interpolator.initialize(&self.x, &self.y)?;
        Ok(())
    }

    /// Mutable access to the values. Callers must [`update`](Self::update)
    /// before interpolating again.
    pub(crate) fn y_mut(&mut self) -> &mut [f64] {
        &mut self.y
    }

    /// Abscissas alongside mutable values, under the same contract as
    /// [`y_mut`](Self::y_mut).
    pub(crate) fn knots_mut(&mut self) -> (&[f64], &mut [f64]) {
        (&self.x, &mut self.y)
    }
}

impl PartialEq for Curve {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.method == other.method
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Curve(x=[{}, ..., {}], y=[{}, ..., {}], method={})",
            self.min_x(),
            self.max_x(),
            self.y[0],
            self.last_y(),
            self.method
        )
    }
}
