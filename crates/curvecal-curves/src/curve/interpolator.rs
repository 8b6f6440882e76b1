//! Interpolator dispatch for [`Curve`](super::Curve).

use curvecal_math::interpolation::{
    BracketInterpolator, CubicSpline, FlatForward, LinearDiscountFactor, LinearZero,
    MonotoneConvex,
};
use curvecal_math::MathResult;

use crate::interpolation::InterpolationMethod;

/// The single interpolator a curve owns, chosen by its method.
#[derive(Debug, Clone)]
pub(crate) enum CurveInterpolator {
    LinearDiscountFactor(LinearDiscountFactor),
    LinearZero(LinearZero),
    FlatForward(FlatForward),
    CubicSpline(CubicSpline),
    MonotoneConvex(MonotoneConvex),
}

impl CurveInterpolator {
    /// Creates an uninitialized interpolator for `method`.
    pub(crate) fn for_method(method: InterpolationMethod) -> Self {
        match method {
            InterpolationMethod::LinearDiscountFactor => {
                Self::LinearDiscountFactor(LinearDiscountFactor::default())
            }
            InterpolationMethod::LinearZero => Self::LinearZero(LinearZero),
            InterpolationMethod::FlatForward => Self::FlatForward(FlatForward::default()),
            InterpolationMethod::CubicSpline => Self::CubicSpline(CubicSpline::default()),
            InterpolationMethod::MonotoneConvex => Self::MonotoneConvex(MonotoneConvex::default()),
        }
    }

    fn inner(&self) -> &dyn BracketInterpolator {
        match self {
            Self::LinearDiscountFactor(i) => i,
            Self::LinearZero(i) => i,
            Self::FlatForward(i) => i,
            Self::CubicSpline(i) => i,
            Self::MonotoneConvex(i) => i,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn BracketInterpolator {
        match self {
            Self::LinearDiscountFactor(i) => i,
            Self::LinearZero(i) => i,
            Self::FlatForward(i) => i,
            Self::CubicSpline(i) => i,
            Self::MonotoneConvex(i) => i,
        }
    }
}

impl BracketInterpolator for CurveInterpolator {
    fn initialize(&mut self, xs: &[f64], ys: &[f64]) -> MathResult<()> {
        self.inner_mut().initialize(xs, ys)
    }

    fn interpolate(&self, xs: &[f64], ys: &[f64], index: usize, x: f64) -> MathResult<f64> {
        self.inner().interpolate(xs, ys, index, x)
    }
}
