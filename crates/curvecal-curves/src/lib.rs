//! # Curvecal Curves
//!
//! Yield curve construction and calibration for the Curvecal engine.
//!
//! This crate provides:
//!
//! - **Curves**: [`Curve`], an ordered knot set with one interpolator and
//!   side-tagged extrapolation errors
//! - **Dates**: conversions between [`chrono::NaiveDate`] and day serials
//! - **Adjustment**: [`CurveAdjuster`], an anchor curve and a basis spread
//!   curve that take trial perturbations and roll them back
//! - **Calibration**: [`CurveCalibrator`], which drives an adjuster with
//!   Broyden's method until every instrument reprices
//!
//! ## Quick Start
//!
//! ```rust
//! use curvecal_curves::prelude::*;
//!
//! let curve = Curve::new(
//!     vec![44287.0, 44652.0, 46113.0],
//!     vec![0.010, 0.015, 0.025],
//!     InterpolationMethod::MonotoneConvex,
//! )
//! .unwrap();
//!
//! let rate = curve.interpolate(45000.0).unwrap();
//! let df = curve.discount_factor(45000.0).unwrap();
//! assert!(rate > 0.0 && df < 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::float_cmp)]

pub mod adjuster;
pub mod calibration;
pub mod curve;
pub mod dates;
pub mod error;
pub mod interpolation;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adjuster::{
        merge_nodes, AdjusterState, CurveAdjuster, CurveAdjusterBuilder, CurveAdjusterParams,
        StubType,
    };
    pub use crate::calibration::{
        CalibrationConfig, CalibrationObjective, CalibrationResult, CurveCalibrator,
        PricingFunction,
    };
    pub use crate::curve::Curve;
    pub use crate::dates::{date_from_serial, serial_from_date};
    pub use crate::error::{CurveError, CurveLeg, CurveResult, CurveSide};
    pub use crate::interpolation::InterpolationMethod;
}

pub use adjuster::{CurveAdjuster, CurveAdjusterParams};
pub use calibration::{CurveCalibrator, PricingFunction};
pub use curve::Curve;
pub use error::{CurveError, CurveResult};
pub use interpolation::InterpolationMethod;
