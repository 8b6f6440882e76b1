//! Interpolation methods for yield curves.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CurveError;

/// Interpolation methods for knot curves.
///
/// Serialized as the short codes `LDF`, `LZ`, `FF`, `CS` and `MC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InterpolationMethod {
    /// Linear interpolation on discount factors.
    #[serde(rename = "LDF")]
    LinearDiscountFactor,

    /// Linear interpolation on zero rates.
    #[default]
    #[serde(rename = "LZ")]
    LinearZero,

    /// Flat forward rates.
    #[serde(rename = "FF")]
    FlatForward,

    /// Natural cubic spline on zero rates.
    #[serde(rename = "CS")]
    CubicSpline,

    /// Monotone convex interpolation (Hagan-West).
    #[serde(rename = "MC")]
    MonotoneConvex,
}

impl InterpolationMethod {
    /// All methods, in code order.
    pub const ALL: [Self; 5] = [
        Self::LinearDiscountFactor,
        Self::LinearZero,
        Self::FlatForward,
        Self::CubicSpline,
        Self::MonotoneConvex,
    ];

    /// Returns the short code for this method.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::LinearDiscountFactor => "LDF",
            Self::LinearZero => "LZ",
            Self::FlatForward => "FF",
            Self::CubicSpline => "CS",
            Self::MonotoneConvex => "MC",
        }
    }

    /// Looks up a method by short code, falling back to linear zero.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|m| m.code() == code)
            .unwrap_or_default()
    }
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LinearDiscountFactor => "Linear Discount Factor",
            Self::LinearZero => "Linear Zero",
            Self::FlatForward => "Flat Forward",
            Self::CubicSpline => "Cubic Spline",
            Self::MonotoneConvex => "Monotone Convex",
        };
        write!(f, "{name}")
    }
}

impl FromStr for InterpolationMethod {
    type Err = CurveError;

    /// Parses a short code or a display name, case-insensitively.
    ///
    /// Unlike [`InterpolationMethod::from_code`], unknown input is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| {
                m.code().eq_ignore_ascii_case(wanted)
                    || m.to_string().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| CurveError::configuration(format!("unknown interpolation method: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for method in InterpolationMethod::ALL {
            assert_eq!(InterpolationMethod::from_code(method.code()), method);
        }
    }

    #[test]
    fn test_unknown_code_defaults_to_linear_zero() {
        assert_eq!(
            InterpolationMethod::from_code("XYZ"),
            InterpolationMethod::LinearZero
        );
        assert_eq!(InterpolationMethod::default(), InterpolationMethod::LinearZero);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "ldf".parse::<InterpolationMethod>().unwrap(),
            InterpolationMethod::LinearDiscountFactor
        );
        assert_eq!(
            "Monotone Convex".parse::<InterpolationMethod>().unwrap(),
            InterpolationMethod::MonotoneConvex
        );
        assert!("XYZ".parse::<InterpolationMethod>().is_err());
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&InterpolationMethod::FlatForward).unwrap();
        assert_eq!(json, "\"FF\"");

        let parsed: InterpolationMethod = serde_json::from_str("\"CS\"").unwrap();
        assert_eq!(parsed, InterpolationMethod::CubicSpline);
    }
}
