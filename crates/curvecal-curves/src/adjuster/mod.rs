//! Coupled anchor and basis curves under trial adjustment.
//!
//! A [`CurveAdjuster`] owns two legs. The anchor leg is a rate curve in its
//! own right. The basis leg is stored as a diff curve over the anchor, and
//! the basis curve proper is rebuilt as `anchor + diff` on the anchor knots
//! whenever either leg moves. Each leg also carries up to two bridge curves
//! for dates where adjacent calibration buckets overlap.
//!
//! Calibration drives the adjuster through three states:
//!
//! - **Seeded**: curves built from the seed curves, snapshot taken.
//! - **Calibrating**: a trial vector has been applied with
//!   [`adjust_curves`](CurveAdjuster::adjust_curves). Every trial starts
//!   from the last snapshot, so trials never accumulate.
//!   [`restore_curves`](CurveAdjuster::restore_curves) drops the trial and
//!   returns to the state the snapshot was taken in.
//! - **Accepted**: [`accept_curves`](CurveAdjuster::accept_curves) made the
//!   live curves the new snapshot.
//!
//! # Adjustment vector layout
//!
//! Anchor entries come first, then basis entries. Within a leg, entry `k`
//! belongs to the `k`-th maturity of `short ++ mid ++ long`:
//!
//! | bucket dates                  | adjusts                       |
//! |-------------------------------|-------------------------------|
//! | short, not overlapping        | primary curve knot            |
//! | short, overlapping mid        | short-mid bridge knot         |
//! | mid, not overlapping          | primary curve knot            |
//! | mid, overlapping long         | mid-long bridge knot          |
//! | long                          | primary curve knot            |
//!
//! The basis leg's primary curve is the diff curve.

mod params;

pub use params::{CurveAdjusterParams, OVERLAP_THRESHOLD};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::error::{CurveError, CurveLeg, CurveResult};
use crate::interpolation::InterpolationMethod;
use curvecal_math::interpolation::DAYS_PER_YEAR;

/// Nodes closer than this many days are merged into one.
pub const MERGE_TOLERANCE: f64 = 0.5;

/// How the valuation-date knot of the anchor curve is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StubType {
    /// Copy the first calibrated knot.
    #[default]
    Flat,
    /// Extend the line through the first two calibrated knots.
    Linear,
}

/// Lifecycle state of a [`CurveAdjuster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjusterState {
    /// Built from the seed curves; nothing applied yet.
    Seeded,
    /// A trial adjustment is applied on top of the snapshot.
    Calibrating,
    /// The live curves were accepted as the new snapshot.
    Accepted,
}

/// Long-end rule for a leg whose grid ends at the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LongEnd {
    FlatForward,
    Flat,
}

/// Primary curve and bridge curves of one leg.
#[derive(Debug, Clone)]
struct LegCurves {
    primary: Curve,
    short_mid: Option<Curve>,
    mid_long: Option<Curve>,
    stub: StubType,
    long_end: LongEnd,
    /// Whether the last knot is the extrapolated horizon.
    extends: bool,
    /// Whether the leg has calibration instruments at all.
    calibrated: bool,
}

impl LegCurves {
    fn build(
        seed: &Curve,
        params: &CurveAdjusterParams,
        valuation_date: f64,
        curve_max_date: f64,
        stub: StubType,
        long_end: LongEnd,
    ) -> CurveResult<Self> {
        let method = params.interpolation_method();

        if params.is_empty() {
            return Ok(Self {
                primary: Curve::new(seed.x().to_vec(), seed.y().to_vec(), method)?,
                short_mid: None,
                mid_long: None,
                stub,
                long_end,
                extends: false,
                calibrated: false,
            });
        }

        let dates = params.curve_dates(valuation_date, curve_max_date);
        let extends = params.extends_to(curve_max_date);
        let free_end = if extends { dates.len() - 1 } else { dates.len() };

        let mut rates = vec![0.0; dates.len()];
        for (rate, &date) in rates[1..free_end].iter_mut().zip(&dates[1..free_end]) {
            *rate = seed.interpolate(date)?;
        }
        finish_knots(&dates, &mut rates, stub, long_end, extends);

        Ok(Self {
            primary: Curve::new(dates, rates, method)?,
            short_mid: bridge(&params.short_mid_overlap_dates(valuation_date))?,
            mid_long: bridge(&params.mid_long_overlap_dates(valuation_date))?,
            stub,
            long_end,
            extends,
            calibrated: true,
        })
    }

    /// Adds one leg's slice of the adjustment vector.
    fn apply(&mut self, delta: &[f64], params: &CurveAdjusterParams) {
        if !self.calibrated {
            return;
        }

        let short_overlap = params.num_short_mid_overlap_points();
        let mid_overlap = params.num_mid_long_overlap_points();
        let short_free = params.short_dates().len() - short_overlap;
        let mid_free = params.mid_dates().len() - mid_overlap;
        let long = params.long_dates().len();

        let (short_delta, rest) = delta.split_at(short_free);
        let (short_mid_delta, rest) = rest.split_at(short_overlap);
        let (mid_delta, rest) = rest.split_at(mid_free);
        let (mid_long_delta, long_delta) = rest.split_at(mid_overlap);

        let primary = &mut self.primary.y_mut()[1..];
        let (short_knots, rest) = primary.split_at_mut(short_free);
        let (mid_knots, long_knots) = rest.split_at_mut(mid_free);
        add_into(short_knots, short_delta);
        add_into(mid_knots, mid_delta);
        add_into(&mut long_knots[..long], long_delta);

        if let Some(bridge) = self.short_mid.as_mut() {
            add_into(&mut bridge.y_mut()[1..], short_mid_delta);
        }
        if let Some(bridge) = self.mid_long.as_mut() {
            add_into(&mut bridge.y_mut()[1..], mid_long_delta);
        }

        let (x, y) = self.primary.knots_mut();
        finish_knots(x, y, self.stub, self.long_end, self.extends);
    }

    /// Copies knot values back from a snapshot without rebuilding.
    fn copy_values_from(&mut self, snapshot: &Self) {
        self.primary.y_mut().copy_from_slice(snapshot.primary.y());
        for (live, saved) in [
            (self.short_mid.as_mut(), snapshot.short_mid.as_ref()),
            (self.mid_long.as_mut(), snapshot.mid_long.as_ref()),
        ] {
            if let (Some(live), Some(saved)) = (live, saved) {
                live.y_mut().copy_from_slice(saved.y());
            }
        }
    }

    fn update(&mut self) -> CurveResult<()> {
        self.primary.update()?;
        if let Some(bridge) = self.short_mid.as_mut() {
            bridge.update()?;
        }
        if let Some(bridge) = self.mid_long.as_mut() {
            bridge.update()?;
        }
        Ok(())
    }

    /// Sum of the bridge curves at `x`, flat beyond each bridge's last knot.
    fn bridge_value(&self, x: f64) -> CurveResult<f64> {
        let mut total = 0.0;
        for bridge in [&self.short_mid, &self.mid_long].into_iter().flatten() {
            total += if x >= bridge.max_x() {
                bridge.last_y()
            } else {
                bridge.interpolate(x)?
            };
        }
        Ok(total)
    }
}

fn add_into(values: &mut [f64], delta: &[f64]) {
    for (v, d) in values.iter_mut().zip(delta) {
        *v += d;
    }
}

/// Bridge curve on `dates` with zero values, or `None` without overlap.
fn bridge(dates: &[f64]) -> CurveResult<Option<Curve>> {
    if dates.len() < 2 {
        return Ok(None);
    }
    Curve::new(
        dates.to_vec(),
        vec![0.0; dates.len()],
        InterpolationMethod::LinearZero,
    )
    .map(Some)
}

/// Sets the valuation-date knot and, when the grid ends at the horizon, the
/// horizon knot.
fn finish_knots(x: &[f64], y: &mut [f64], stub: StubType, long_end: LongEnd, extends: bool) {
    let n = y.len();
    let free = if extends { n - 1 } else { n };

    y[0] = match stub {
        StubType::Linear if free >= 3 => {
            let slope = (y[2] - y[1]) / (x[2] - x[1]);
            y[1] - slope * (x[1] - x[0])
        }
        _ => y[1],
    };

    if !extends {
        return;
    }
    y[n - 1] = match long_end {
        LongEnd::FlatForward if n >= 3 => {
            let t1 = (x[n - 3] - x[0]) / DAYS_PER_YEAR;
            let t2 = (x[n - 2] - x[0]) / DAYS_PER_YEAR;
            let t3 = (x[n - 1] - x[0]) / DAYS_PER_YEAR;
            let forward = (y[n - 2] * t2 - y[n - 3] * t1) / (t2 - t1);
            (y[n - 2] * t2 + forward * (t3 - t2)) / t3
        }
        _ => y[n - 2],
    };
}

/// Merges two ascending node sets, treating nodes within
/// [`MERGE_TOLERANCE`] days of each other as one. On a tie the node from
/// `a` is kept.
#[must_use]
pub fn merge_nodes(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);

    while i < a.len() || j < b.len() {
        if j == b.len() || (i < a.len() && b[j] - a[i] > MERGE_TOLERANCE) {
            merged.push(a[i]);
            i += 1;
        } else if i == a.len() || a[i] - b[j] > MERGE_TOLERANCE {
            merged.push(b[j]);
            j += 1;
        } else {
            merged.push(a[i]);
            i += 1;
            j += 1;
        }
    }
    merged
}

/// Anchor and basis curves under calibration.
///
/// Built with [`CurveAdjuster::builder`].
#[derive(Debug, Clone)]
pub struct CurveAdjuster {
    valuation_date: f64,
    curve_max_date: f64,
    anchor_params: CurveAdjusterParams,
    basis_params: CurveAdjusterParams,
    anchor: LegCurves,
    diff: LegCurves,
    anchor_snapshot: LegCurves,
    diff_snapshot: LegCurves,
    basis: Curve,
    high_res_basis: Option<Curve>,
    input_discount_curve: Option<Curve>,
    anchor_is_discount: bool,
    anchor_fixing: Option<f64>,
    stub_type: StubType,
    state: AdjusterState,
    /// State the snapshot was taken in, Seeded or Accepted.
    snapshot_state: AdjusterState,
}

impl CurveAdjuster {
    /// Starts building an adjuster for curves spanning
    /// `[valuation_date, curve_max_date]`.
    #[must_use]
    pub fn builder(valuation_date: f64, curve_max_date: f64) -> CurveAdjusterBuilder {
        CurveAdjusterBuilder {
            valuation_date,
            curve_max_date,
            anchor: None,
            basis: None,
            input_discount_curve: None,
            anchor_is_discount: true,
            anchor_fixing: None,
            stub_type: StubType::default(),
        }
    }

    /// Valuation date serial.
    pub fn valuation_date(&self) -> f64 {
        self.valuation_date
    }

    /// Horizon date serial.
    pub fn curve_max_date(&self) -> f64 {
        self.curve_max_date
    }

    /// Anchor leg buckets.
    pub fn anchor_params(&self) -> &CurveAdjusterParams {
        &self.anchor_params
    }

    /// Basis leg buckets.
    pub fn basis_params(&self) -> &CurveAdjusterParams {
        &self.basis_params
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AdjusterState {
        self.state
    }

    /// Stub rule of the anchor leg.
    pub fn stub_type(&self) -> StubType {
        self.stub_type
    }

    /// Whether the anchor doubles as the discount curve.
    pub fn anchor_is_discount(&self) -> bool {
        self.anchor_is_discount
    }

    /// Externally supplied discount curve, if any.
    pub fn input_discount_curve(&self) -> Option<&Curve> {
        self.input_discount_curve.as_ref()
    }

    /// Fixing of the anchor index on the valuation date, if known.
    pub fn anchor_fixing(&self) -> Option<f64> {
        self.anchor_fixing
    }

    /// Length of the adjustment vector.
    pub fn dimension(&self) -> usize {
        self.anchor_params.num_total_points() + self.basis_params.num_total_points()
    }

    /// The anchor curve.
    pub fn anchor_curve(&self) -> &Curve {
        &self.anchor.primary
    }

    /// The diff curve: basis minus anchor.
    pub fn diff_curve(&self) -> &Curve {
        &self.diff.primary
    }

    /// The basis curve: anchor plus diff on the anchor knots.
    pub fn basis_curve(&self) -> &Curve {
        &self.basis
    }

    /// Anchor plus diff on the union of both knot sets, when the basis
    /// parameters ask for it.
    pub fn high_res_basis_curve(&self) -> Option<&Curve> {
        self.high_res_basis.as_ref()
    }

    /// The curve used for discounting.
    pub fn discount_curve(&self) -> &Curve {
        if self.anchor_is_discount {
            &self.anchor.primary
        } else {
            &self.basis
        }
    }

    /// Short-mid bridge curve of `leg`, if its buckets overlap.
    pub fn short_mid_bridge(&self, leg: CurveLeg) -> Option<&Curve> {
        self.leg(leg).short_mid.as_ref()
    }

    /// Mid-long bridge curve of `leg`, if its buckets overlap.
    pub fn mid_long_bridge(&self, leg: CurveLeg) -> Option<&Curve> {
        self.leg(leg).mid_long.as_ref()
    }

    /// Sum of `leg`'s bridge curves at `x`.
    ///
    /// Each bridge is interpolated inside its knots and held flat beyond
    /// the last one. Zero when the leg has no bridges.
    ///
    /// # Errors
    ///
    /// `ExtrapolationOutOfRange` for `x` before the valuation date.
    pub fn bridge_adjustment(&self, leg: CurveLeg, x: f64) -> CurveResult<f64> {
        self.leg(leg).bridge_value(x)
    }

    fn leg(&self, leg: CurveLeg) -> &LegCurves {
        match leg {
            CurveLeg::Anchor => &self.anchor,
            CurveLeg::Basis => &self.diff,
        }
    }

    /// Puts every curve back to the last snapshot, and the state back to
    /// the one the snapshot was taken in.
    pub fn restore_curves(&mut self) -> CurveResult<()> {
        self.restore_values();
        self.state = self.snapshot_state;
        self.anchor.update()?;
        self.diff.update()?;
        self.refresh_basis()
    }

    fn restore_values(&mut self) {
        self.anchor.copy_values_from(&self.anchor_snapshot);
        self.diff.copy_values_from(&self.diff_snapshot);
    }

    /// Applies a trial adjustment on top of the last snapshot.
    ///
    /// The vector is checked before anything is touched, so a rejected
    /// vector leaves the curves as they were.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the length differs from [`dimension`](Self::dimension).
    /// - `NonFiniteAdjustment` for a `NaN` or infinite entry, naming the leg
    ///   and the entry's position within that leg.
    pub fn adjust_curves(&mut self, delta: &[f64]) -> CurveResult<()> {
        let dimension = self.dimension();
        if delta.len() != dimension {
            return Err(CurveError::configuration(format!(
                "adjustment vector has {} entries, expected {dimension}",
                delta.len()
            )));
        }

        let anchor_len = self.anchor_params.num_total_points();
        if let Some(k) = delta.iter().position(|d| !d.is_finite()) {
            return Err(if k < anchor_len {
                CurveError::non_finite(CurveLeg::Anchor, k, self.anchor_params.index())
            } else {
                CurveError::non_finite(CurveLeg::Basis, k - anchor_len, self.basis_params.index())
            });
        }

        self.state = AdjusterState::Calibrating;
        self.restore_values();

        let (anchor_delta, basis_delta) = delta.split_at(anchor_len);
        self.anchor.apply(anchor_delta, &self.anchor_params);
        self.diff.apply(basis_delta, &self.basis_params);

        self.anchor.update()?;
        self.diff.update()?;
        self.refresh_basis()?;

        trace!(
            "Adjusted {}/{} with {} entries, max |delta| {:.3e}",
            self.anchor_params.index(),
            self.basis_params.index(),
            delta.len(),
            delta.iter().fold(0.0_f64, |m, d| m.max(d.abs()))
        );
        Ok(())
    }

    /// Makes the live curves the new snapshot.
    pub fn accept_curves(&mut self) {
        self.anchor_snapshot = self.anchor.clone();
        self.diff_snapshot = self.diff.clone();
        self.state = AdjusterState::Accepted;
        self.snapshot_state = AdjusterState::Accepted;
        debug!(
            "Accepted curves for {}/{}",
            self.anchor_params.index(),
            self.basis_params.index()
        );
    }

    /// Replaces the anchor values with those of `curve`.
    ///
    /// Only allowed when the anchor leg is not calibrated here, and `curve`
    /// has exactly the anchor's dates.
    ///
    /// # Errors
    ///
    /// `Configuration` otherwise.
    pub fn update_anchor_curve(&mut self, curve: &Curve) -> CurveResult<()> {
        if !self.anchor_params.is_empty() {
            return Err(CurveError::configuration(
                "cannot update the anchor curve while it has calibration instruments",
            ));
        }
        if curve.len() != self.anchor.primary.len() {
            return Err(CurveError::configuration(format!(
                "cannot change the number of anchor points from {} to {}",
                self.anchor.primary.len(),
                curve.len()
            )));
        }
        if curve.x() != self.anchor.primary.x() {
            return Err(CurveError::configuration(
                "cannot change dates on the anchor curve",
            ));
        }

        self.anchor.primary.set_y(curve.y())?;
        self.anchor_snapshot.primary.set_y(curve.y())?;
        self.refresh_basis()
    }

    /// Diff value at `x`, held flat outside the diff curve's knots.
    fn diff_at(&self, x: f64) -> CurveResult<f64> {
        let diff = &self.diff.primary;
        if x >= diff.max_x() {
            Ok(diff.last_y())
        } else if x <= diff.min_x() {
            Ok(diff.y()[0])
        } else {
            diff.interpolate(x)
        }
    }

    /// Rebuilds the basis curve and, if wanted, the high resolution one.
    fn refresh_basis(&mut self) -> CurveResult<()> {
        let anchor = &self.anchor.primary;
        let rates = anchor
            .x()
            .iter()
            .zip(anchor.y())
            .map(|(&x, &y)| Ok(y + self.diff_at(x)?))
            .collect::<CurveResult<Vec<_>>>()?;
        self.basis.set_y(&rates)?;

        if self.basis_params.is_high_res() {
            self.high_res_basis = Some(self.build_high_res()?);
        }
        Ok(())
    }

    fn build_high_res(&self) -> CurveResult<Curve> {
        let anchor = &self.anchor.primary;
        let (lo, hi) = (anchor.min_x(), anchor.max_x());

        let mut nodes: Vec<f64> = Vec::new();
        for node in merge_nodes(anchor.x(), self.diff.primary.x()) {
            if node < lo || node > hi {
                continue;
            }
            if nodes.last().map_or(true, |&last| node > last) {
                nodes.push(node);
            }
        }

        let rates = nodes
            .iter()
            .map(|&x| Ok(anchor.interpolate(x)? + self.diff_at(x)?))
            .collect::<CurveResult<Vec<_>>>()?;
        Curve::new(nodes, rates, self.basis_params.interpolation_method())
    }
}

/// Builder for [`CurveAdjuster`].
#[derive(Debug, Clone)]
pub struct CurveAdjusterBuilder {
    valuation_date: f64,
    curve_max_date: f64,
    anchor: Option<(Curve, CurveAdjusterParams)>,
    basis: Option<(Curve, CurveAdjusterParams)>,
    input_discount_curve: Option<Curve>,
    anchor_is_discount: bool,
    anchor_fixing: Option<f64>,
    stub_type: StubType,
}

impl CurveAdjusterBuilder {
    /// Sets the anchor seed curve and buckets. Required.
    #[must_use]
    pub fn anchor(mut self, seed: Curve, params: CurveAdjusterParams) -> Self {
        self.anchor = Some((seed, params));
        self
    }

    /// Sets the basis seed curve and buckets.
    ///
    /// Without a basis leg the basis curve equals the anchor.
    #[must_use]
    pub fn basis(mut self, seed: Curve, params: CurveAdjusterParams) -> Self {
        self.basis = Some((seed, params));
        self
    }

    /// Supplies an external discount curve for pricing functions.
    #[must_use]
    pub fn input_discount_curve(mut self, curve: Curve) -> Self {
        self.input_discount_curve = Some(curve);
        self
    }

    /// Chooses whether the anchor (default) or the basis curve discounts.
    #[must_use]
    pub fn anchor_is_discount(mut self, anchor_is_discount: bool) -> Self {
        self.anchor_is_discount = anchor_is_discount;
        self
    }

    /// Sets the anchor index fixing on the valuation date.
    #[must_use]
    pub fn anchor_fixing(mut self, fixing: f64) -> Self {
        self.anchor_fixing = Some(fixing);
        self
    }

    /// Sets the anchor stub rule.
    #[must_use]
    pub fn stub_type(mut self, stub_type: StubType) -> Self {
        self.stub_type = stub_type;
        self
    }

    /// Builds both legs from their seeds and takes the first snapshot.
    ///
    /// The diff seed is the basis seed minus the anchor seed, sampled on the
    /// anchor seed's knots.
    ///
    /// # Errors
    ///
    /// - `Configuration` without an anchor, with a horizon not after the
    ///   valuation date, or with invalid buckets.
    /// - Curve errors when a seed does not cover the knot grid.
    pub fn build(self) -> CurveResult<CurveAdjuster> {
        let Self {
            valuation_date,
            curve_max_date,
            anchor,
            basis,
            input_discount_curve,
            anchor_is_discount,
            anchor_fixing,
            stub_type,
        } = self;

        if !(valuation_date.is_finite() && curve_max_date.is_finite())
            || curve_max_date <= valuation_date
        {
            return Err(CurveError::configuration(format!(
                "curve horizon {curve_max_date} must follow valuation date {valuation_date}"
            )));
        }
        let (anchor_seed, anchor_params) =
            anchor.ok_or_else(|| CurveError::configuration("an anchor curve is required"))?;
        let (basis_seed, basis_params) = basis.unwrap_or_else(|| {
            let params = CurveAdjusterParams::empty(
                anchor_params.index(),
                anchor_params.interpolation_method(),
            );
            (anchor_seed.clone(), params)
        });
        anchor_params.validate()?;
        basis_params.validate()?;

        let diff_seed = curve_diff(&anchor_seed, &basis_seed)?;
        let anchor = LegCurves::build(
            &anchor_seed,
            &anchor_params,
            valuation_date,
            curve_max_date,
            stub_type,
            LongEnd::FlatForward,
        )?;
        let diff = LegCurves::build(
            &diff_seed,
            &basis_params,
            valuation_date,
            curve_max_date,
            StubType::Flat,
            LongEnd::Flat,
        )?;

        let basis = Curve::new(
            anchor.primary.x().to_vec(),
            anchor.primary.y().to_vec(),
            basis_params.interpolation_method(),
        )?;

        let mut adjuster = CurveAdjuster {
            valuation_date,
            curve_max_date,
            anchor_snapshot: anchor.clone(),
            diff_snapshot: diff.clone(),
            anchor,
            diff,
            anchor_params,
            basis_params,
            basis,
            high_res_basis: None,
            input_discount_curve,
            anchor_is_discount,
            anchor_fixing,
            stub_type,
            state: AdjusterState::Seeded,
            snapshot_state: AdjusterState::Seeded,
        };
        adjuster.refresh_basis()?;

        debug!(
            "Seeded adjuster {}/{}: {} anchor knots, {} diff knots, dimension {}",
            adjuster.anchor_params.index(),
            adjuster.basis_params.index(),
            adjuster.anchor.primary.len(),
            adjuster.diff.primary.len(),
            adjuster.dimension()
        );
        Ok(adjuster)
    }
}

/// `basis - anchor` on the anchor's knots, as a linear discount factor curve.
fn curve_diff(anchor: &Curve, basis: &Curve) -> CurveResult<Curve> {
    let rates = anchor
        .x()
        .iter()
        .zip(anchor.y())
        .map(|(&x, &y)| Ok(basis.interpolate(x)? - y))
        .collect::<CurveResult<Vec<_>>>()?;
    Curve::new(
        anchor.x().to_vec(),
        rates,
        InterpolationMethod::LinearDiscountFactor,
    )
}
