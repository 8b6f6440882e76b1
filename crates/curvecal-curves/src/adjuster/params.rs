//! Calibration buckets for one adjuster leg.

use std::cell::OnceCell;
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{CurveError, CurveResult};
use crate::interpolation::InterpolationMethod;

/// Dates closer than this many days to the first date of the next bucket
/// are treated as overlapping it.
pub const OVERLAP_THRESHOLD: f64 = 7.0;

/// Calibration maturities for one leg, split into short, mid and long
/// buckets.
///
/// Each bucket is ascending and any bucket may be empty. When the tail of a
/// bucket runs into the head of the next one, those tail dates are moved off
/// the primary knot grid and onto a bridge curve of their own.
///
/// Overlap counts are computed on first use and cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveAdjusterParams {
    /// Rate index name, used in error messages.
    index: String,
    /// Short bucket maturities (day serials).
    short_dates: Vec<f64>,
    /// Mid bucket maturities.
    mid_dates: Vec<f64>,
    /// Long bucket maturities.
    long_dates: Vec<f64>,
    /// Interpolation method of the leg's primary curve.
    interpolation_method: InterpolationMethod,
    /// Whether to build the high resolution composite curve.
    #[serde(default)]
    high_res: bool,
    #[serde(skip)]
    short_mid_overlap: OnceCell<usize>,
    #[serde(skip)]
    mid_long_overlap: OnceCell<usize>,
}

impl CurveAdjusterParams {
    /// Creates bucket parameters.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if a bucket is not strictly ascending or holds
    /// a non-finite date.
    pub fn new(
        index: impl Into<String>,
        short_dates: Vec<f64>,
        mid_dates: Vec<f64>,
        long_dates: Vec<f64>,
        interpolation_method: InterpolationMethod,
    ) -> CurveResult<Self> {
        let params = Self {
            index: index.into(),
            short_dates,
            mid_dates,
            long_dates,
            interpolation_method,
            high_res: false,
            short_mid_overlap: OnceCell::new(),
            mid_long_overlap: OnceCell::new(),
        };
        params.validate()?;
        Ok(params)
    }

    /// Parameters for a leg with no calibration instruments.
    #[must_use]
    pub fn empty(index: impl Into<String>, interpolation_method: InterpolationMethod) -> Self {
        Self {
            index: index.into(),
            short_dates: Vec::new(),
            mid_dates: Vec::new(),
            long_dates: Vec::new(),
            interpolation_method,
            high_res: false,
            short_mid_overlap: OnceCell::new(),
            mid_long_overlap: OnceCell::new(),
        }
    }

    /// Switches the high resolution composite curve on or off.
    #[must_use]
    pub fn with_high_res(mut self, high_res: bool) -> Self {
        self.high_res = high_res;
        self
    }

    /// Checks that every bucket is finite and strictly ascending.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` naming the offending bucket.
    pub fn validate(&self) -> CurveResult<()> {
        for (name, dates) in [
            ("short", &self.short_dates),
            ("mid", &self.mid_dates),
            ("long", &self.long_dates),
        ] {
            if dates.iter().any(|d| !d.is_finite()) {
                return Err(CurveError::configuration(format!(
                    "{}: {name} dates must be finite",
                    self.index
                )));
            }
            if dates
                .windows(2)
                .any(|w| w[0].partial_cmp(&w[1]) != Some(Ordering::Less))
            {
                return Err(CurveError::configuration(format!(
                    "{}: {name} dates must be strictly ascending",
                    self.index
                )));
            }
        }
        Ok(())
    }

    /// Rate index name.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Short bucket maturities.
    pub fn short_dates(&self) -> &[f64] {
        &self.short_dates
    }

    /// Mid bucket maturities.
    pub fn mid_dates(&self) -> &[f64] {
        &self.mid_dates
    }

    /// Long bucket maturities.
    pub fn long_dates(&self) -> &[f64] {
        &self.long_dates
    }

    /// Interpolation method of the primary curve.
    pub fn interpolation_method(&self) -> InterpolationMethod {
        self.interpolation_method
    }

    /// Whether the high resolution composite curve is wanted.
    pub fn is_high_res(&self) -> bool {
        self.high_res
    }

    /// Number of trailing short dates within [`OVERLAP_THRESHOLD`] days of
    /// the first mid date.
    pub fn num_short_mid_overlap_points(&self) -> usize {
        *self
            .short_mid_overlap
            .get_or_init(|| count_overlap(&self.short_dates, &self.mid_dates))
    }

    /// Number of trailing mid dates within [`OVERLAP_THRESHOLD`] days of the
    /// first long date.
    pub fn num_mid_long_overlap_points(&self) -> usize {
        *self
            .mid_long_overlap
            .get_or_init(|| count_overlap(&self.mid_dates, &self.long_dates))
    }

    /// Knots of the short-mid bridge curve: the valuation date followed by
    /// the overlapping short dates.
    pub fn short_mid_overlap_dates(&self, valuation_date: f64) -> Vec<f64> {
        bridge_dates(
            valuation_date,
            &self.short_dates,
            self.num_short_mid_overlap_points(),
        )
    }

    /// Knots of the mid-long bridge curve: the valuation date followed by the
    /// overlapping mid dates.
    pub fn mid_long_overlap_dates(&self, valuation_date: f64) -> Vec<f64> {
        bridge_dates(
            valuation_date,
            &self.mid_dates,
            self.num_mid_long_overlap_points(),
        )
    }

    /// Number of calibration points on this leg.
    ///
    /// Overlapping dates still count: they move to a bridge curve but keep
    /// their own adjustment slot.
    pub fn num_curve_points(&self) -> usize {
        self.num_total_points()
    }

    /// Total number of instruments across the three buckets.
    pub fn num_total_points(&self) -> usize {
        self.short_dates.len() + self.mid_dates.len() + self.long_dates.len()
    }

    /// Returns true when the leg has no calibration instruments.
    pub fn is_empty(&self) -> bool {
        self.num_total_points() == 0
    }

    /// Returns true when the knot grid ends with an extra horizon knot
    /// beyond the last long date.
    pub fn extends_to(&self, curve_max_date: f64) -> bool {
        self.long_dates
            .last()
            .is_some_and(|&last| last < curve_max_date)
    }

    /// Knot grid of the primary curve.
    ///
    /// The valuation date, the non-overlapping short and mid dates, every
    /// long date, then `curve_max_date` when the long bucket stops short of
    /// it. With no dates at all the grid is `[valuation_date,
    /// curve_max_date]`.
    pub fn curve_dates(&self, valuation_date: f64, curve_max_date: f64) -> Vec<f64> {
        if self.is_empty() {
            return vec![valuation_date, curve_max_date];
        }

        let short_free = self.short_dates.len() - self.num_short_mid_overlap_points();
        let mid_free = self.mid_dates.len() - self.num_mid_long_overlap_points();

        let mut dates = Vec::with_capacity(short_free + mid_free + self.long_dates.len() + 2);
        dates.push(valuation_date);
        dates.extend_from_slice(&self.short_dates[..short_free]);
        dates.extend_from_slice(&self.mid_dates[..mid_free]);
        dates.extend_from_slice(&self.long_dates);
        if self.extends_to(curve_max_date) {
            dates.push(curve_max_date);
        }
        dates
    }
}

impl PartialEq for CurveAdjusterParams {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.short_dates == other.short_dates
            && self.mid_dates == other.mid_dates
            && self.long_dates == other.long_dates
            && self.interpolation_method == other.interpolation_method
            && self.high_res == other.high_res
    }
}

fn count_overlap(earlier: &[f64], later: &[f64]) -> usize {
    let Some(&next) = later.first() else {
        return 0;
    };
    earlier
        .iter()
        .rev()
        .take_while(|&&d| d >= next - OVERLAP_THRESHOLD)
        .count()
}

fn bridge_dates(valuation_date: f64, bucket: &[f64], overlap: usize) -> Vec<f64> {
    let mut dates = Vec::with_capacity(overlap + 1);
    dates.push(valuation_date);
    dates.extend_from_slice(&bucket[bucket.len() - overlap..]);
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    const VAL: f64 = 44287.0;
    const MAX: f64 = VAL + 365.0 * 30.0;

    fn params(short: Vec<f64>, mid: Vec<f64>, long: Vec<f64>) -> CurveAdjusterParams {
        CurveAdjusterParams::new("USD-SOFR", short, mid, long, InterpolationMethod::LinearZero)
            .unwrap()
    }

    #[test]
    fn test_rejects_unsorted_buckets() {
        let err = CurveAdjusterParams::new(
            "USD-SOFR",
            vec![44300.0, 44290.0],
            vec![],
            vec![],
            InterpolationMethod::LinearZero,
        )
        .unwrap_err();
        assert!(err.is_engine());
        assert!(err.to_string().contains("short"));

        assert!(CurveAdjusterParams::new(
            "USD-SOFR",
            vec![],
            vec![f64::NAN],
            vec![],
            InterpolationMethod::LinearZero,
        )
        .is_err());
    }

    #[test]
    fn test_no_overlap() {
        let p = params(vec![44317.0, 44348.0], vec![44470.0], vec![45017.0, 45383.0]);

        assert_eq!(p.num_short_mid_overlap_points(), 0);
        assert_eq!(p.num_mid_long_overlap_points(), 0);
        assert_eq!(p.short_mid_overlap_dates(VAL), vec![VAL]);
        assert_eq!(p.num_total_points(), 5);
        assert_eq!(
            p.curve_dates(VAL, MAX),
            vec![VAL, 44317.0, 44348.0, 44470.0, 45017.0, 45383.0, MAX]
        );
    }

    #[test]
    fn test_trailing_dates_overlap() {
        // 44465 and 44468 fall within a week of the first mid date.
        let p = params(
            vec![44317.0, 44465.0, 44468.0],
            vec![44470.0, 44652.0, 45010.0],
            vec![45017.0, 45383.0],
        );

        assert_eq!(p.num_short_mid_overlap_points(), 2);
        assert_eq!(p.num_mid_long_overlap_points(), 1);
        assert_eq!(p.short_mid_overlap_dates(VAL), vec![VAL, 44465.0, 44468.0]);
        assert_eq!(p.mid_long_overlap_dates(VAL), vec![VAL, 45010.0]);

        assert_eq!(
            p.curve_dates(VAL, MAX),
            vec![VAL, 44317.0, 44470.0, 44652.0, 45017.0, 45383.0, MAX]
        );
        // Overlapping dates keep their adjustment slots.
        assert_eq!(p.num_curve_points(), 8);
    }

    #[test]
    fn test_overlap_window_is_one_week() {
        // A month before the first mid date is not an overlap.
        let p = params(vec![VAL + 30.0, VAL + 60.0], vec![VAL + 91.0], vec![]);
        assert_eq!(p.num_short_mid_overlap_points(), 0);
        assert_eq!(p.short_mid_overlap_dates(VAL), vec![VAL]);
        assert_eq!(
            p.curve_dates(VAL, MAX),
            vec![VAL, VAL + 30.0, VAL + 60.0, VAL + 91.0]
        );

        // Exactly one week before is.
        let p = params(vec![VAL + 30.0, VAL + 84.0], vec![VAL + 91.0], vec![]);
        assert_eq!(p.num_short_mid_overlap_points(), 1);
        assert_eq!(p.short_mid_overlap_dates(VAL), vec![VAL, VAL + 84.0]);
        assert_eq!(p.curve_dates(VAL, MAX), vec![VAL, VAL + 30.0, VAL + 91.0]);
    }

    #[test]
    fn test_empty_neighbour_never_overlaps() {
        let p = params(vec![44317.0, 44348.0], vec![], vec![45017.0]);
        assert_eq!(p.num_short_mid_overlap_points(), 0);
        assert_eq!(p.num_mid_long_overlap_points(), 0);
        assert_eq!(p.curve_dates(VAL, MAX), vec![VAL, 44317.0, 44348.0, 45017.0, MAX]);
    }

    #[test]
    fn test_horizon_rules() {
        let empty = CurveAdjusterParams::empty("USD-SOFR", InterpolationMethod::FlatForward);
        assert!(empty.is_empty());
        assert_eq!(empty.curve_dates(VAL, MAX), vec![VAL, MAX]);

        let to_horizon = params(vec![], vec![], vec![45017.0, MAX]);
        assert!(!to_horizon.extends_to(MAX));
        assert_eq!(to_horizon.curve_dates(VAL, MAX), vec![VAL, 45017.0, MAX]);

        let short_only = params(vec![44317.0], vec![], vec![]);
        assert!(!short_only.extends_to(MAX));
        assert_eq!(short_only.curve_dates(VAL, MAX), vec![VAL, 44317.0]);
    }

    #[test]
    fn test_serde_skips_memo() {
        let p = params(vec![44465.0], vec![44470.0], vec![45017.0]).with_high_res(true);
        assert_eq!(p.num_short_mid_overlap_points(), 1);

        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"interpolation_method\":\"LZ\""));
        assert!(!json.contains("overlap"));

        let back: CurveAdjusterParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert!(back.is_high_res());
        assert_eq!(back.num_short_mid_overlap_points(), 1);
    }
}
