//! # Curvecal Math
//!
//! Numerical building blocks for the Curvecal yield curve calibration engine.
//!
//! This crate provides:
//!
//! - **Interpolation**: bracket interpolators over day-serial knots (linear
//!   zero, linear discount factor, flat forward, natural cubic spline,
//!   monotone convex)
//! - **Solvers**: a Broyden quasi-Newton root finder for vector functions
//! - **Linear Algebra**: dense and tridiagonal solves
//!
//! Interpolators never locate brackets or extrapolate; the curve that owns
//! the knots does both and hands them a single bracket.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::if_not_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::single_match_else)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::derivable_impls)]

pub mod error;
pub mod interpolation;
pub mod linear_algebra;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::interpolation::{
        BracketInterpolator, CubicSpline, FlatForward, LinearDiscountFactor, LinearZero,
        MonotoneConvex, DAYS_PER_YEAR,
    };
    pub use crate::solvers::{BroydenConfig, BroydenResult, BroydenSolver, VectorFunction};
}

pub use error::{MathError, MathResult};
