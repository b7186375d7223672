//! Volatility surface construction and queries
//!
//! Raw chain rows are cleaned into [`VolPoint`]s, per-strike point sets are
//! merged into a dense [`VolSurface`], and the surface answers bilinear
//! point queries.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use ndarray::Array2;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::models::option::{OptionType, RawOptionRow, SideFields};
use crate::utils::{date_string_to_days, fill_missing, parse_days_to_expiry};

/// Chain rows keyed by strike, iterated in ascending strike order
pub type StrikeRows = BTreeMap<OrderedFloat<f64>, Vec<RawOptionRow>>;

/// Plausibility rules applied to scraped implied volatilities (in percent)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleaningPolicy {
    /// Exclusive lower bound of a plausible vol
    pub min_vol: f64,
    /// Exclusive upper bound of a plausible vol
    pub max_vol: f64,
    /// A row is dropped when bid IV exceeds ask IV by more than this fraction
    pub quote_tolerance: f64,
}

impl Default for CleaningPolicy {
    fn default() -> Self {
        Self {
            min_vol: 0.1,
            max_vol: 500.0,
            quote_tolerance: 0.10,
        }
    }
}

impl CleaningPolicy {
    /// The value itself when it is a plausible vol
    pub fn valid_vol(&self, v: Option<f64>) -> Option<f64> {
        v.filter(|v| *v > self.min_vol && *v < self.max_vol)
    }

    /// Both quotes valid and bid above ask beyond the tolerance band
    pub fn is_inconsistent(&self, side: &SideFields) -> bool {
        match (self.valid_vol(side.bid_iv), self.valid_vol(side.ask_iv)) {
            (Some(bid), Some(ask)) => bid > ask * (1.0 + self.quote_tolerance),
            _ => false,
        }
    }

    /// Mid IV of one side: average of both quotes, else whichever is valid
    pub fn side_mid(&self, side: &SideFields) -> Option<f64> {
        let bid = self.valid_vol(side.bid_iv);
        let ask = self.valid_vol(side.ask_iv);
        match (bid, ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            (bid, ask) => ask.or(bid),
        }
    }
}

/// Which grid a query reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolSide {
    Call,
    Put,
    #[default]
    Mid,
}

impl From<OptionType> for VolSide {
    fn from(option_type: OptionType) -> Self {
        match option_type {
            OptionType::Call => VolSide::Call,
            OptionType::Put => VolSide::Put,
        }
    }
}

impl std::fmt::Display for VolSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolSide::Call => write!(f, "call"),
            VolSide::Put => write!(f, "put"),
            VolSide::Mid => write!(f, "mid"),
        }
    }
}

impl std::str::FromStr for VolSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "call" | "c" => Ok(VolSide::Call),
            "put" | "p" => Ok(VolSide::Put),
            "mid" | "m" => Ok(VolSide::Mid),
            other => Err(format!("unknown vol side: {}", other)),
        }
    }
}

/// A cleaned implied volatility observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolPoint {
    pub strike: f64,
    /// Whole days to expiry, always positive
    pub days_to_expiry: i64,
    /// Expiration label as scraped
    pub expiration: String,
    pub call_mid_iv: Option<f64>,
    pub put_mid_iv: Option<f64>,
    /// Call mid when present, put mid otherwise
    pub mid_iv: f64,
}

impl VolPoint {
    pub fn value(&self, side: VolSide) -> Option<f64> {
        match side {
            VolSide::Call => self.call_mid_iv,
            VolSide::Put => self.put_mid_iv,
            VolSide::Mid => Some(self.mid_iv),
        }
    }

    /// Put mid minus call mid
    pub fn skew(&self) -> Option<f64> {
        Some(self.put_mid_iv? - self.call_mid_iv?)
    }
}

/// Clean one strike's rows with the default policy
pub fn clean_vol_data(rows: &[RawOptionRow], strike: f64, today: NaiveDate) -> Vec<VolPoint> {
    clean_vol_data_with(rows, strike, today, &CleaningPolicy::default())
}

/// Turn one strike's raw rows into validated points sorted by maturity.
///
/// Rows with an unparseable or non-future expiration, an inconsistent quote
/// on either side, or no usable IV at all are dropped.
pub fn clean_vol_data_with(
    rows: &[RawOptionRow],
    strike: f64,
    today: NaiveDate,
    policy: &CleaningPolicy,
) -> Vec<VolPoint> {
    let mut points: Vec<VolPoint> = rows
        .iter()
        .filter_map(|row| {
            let Some(days) = parse_days_to_expiry(&row.expiration, today) else {
                trace!("Dropping row with expiration {:?}", row.expiration);
                return None;
            };
            if policy.is_inconsistent(&row.call) || policy.is_inconsistent(&row.put) {
                trace!("Dropping inconsistent quote at {} / {}", strike, row.expiration);
                return None;
            }

            let call_mid_iv = policy.side_mid(&row.call);
            let put_mid_iv = policy.side_mid(&row.put);
            let mid_iv = call_mid_iv.or(put_mid_iv)?;

            Some(VolPoint {
                strike,
                days_to_expiry: days,
                expiration: row.expiration.clone(),
                call_mid_iv,
                put_mid_iv,
                mid_iv,
            })
        })
        .collect();

    points.sort_by_key(|p| p.days_to_expiry);
    debug!(
        "Cleaned {} of {} rows for strike {}",
        points.len(),
        rows.len(),
        strike
    );
    points
}

/// Implied volatility surface over strike and days to expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolSurface {
    /// All cleaned points in build order
    pub points: Vec<VolPoint>,
    /// Distinct strikes, ascending
    pub strikes: Vec<f64>,
    /// Distinct days to expiry, ascending
    pub maturities: Vec<i64>,
    /// First expiration label seen for each maturity
    pub maturity_labels: Vec<String>,
    /// Call mid IV, `[strike, maturity]`
    pub grid_call: Array2<Option<f64>>,
    /// Put mid IV, `[strike, maturity]`
    pub grid_put: Array2<Option<f64>>,
    /// Resolved mid IV, `[strike, maturity]`
    pub grid_mid: Array2<Option<f64>>,
}

/// Build a surface from several strikes with the default policy
pub fn build_vol_surface(strike_data: &StrikeRows, today: NaiveDate) -> VolSurface {
    build_vol_surface_with(strike_data, today, &CleaningPolicy::default())
}

/// Build a surface from a single strike's rows (a term structure)
pub fn build_term_structure(rows: &[RawOptionRow], strike: f64, today: NaiveDate) -> VolSurface {
    let mut strike_data = StrikeRows::new();
    strike_data.insert(OrderedFloat(strike), rows.to_vec());
    build_vol_surface(&strike_data, today)
}

/// Clean every strike's rows and assemble the three grids
pub fn build_vol_surface_with(
    strike_data: &StrikeRows,
    today: NaiveDate,
    policy: &CleaningPolicy,
) -> VolSurface {
    let per_strike: Vec<Vec<VolPoint>> = strike_data
        .par_iter()
        .map(|(strike, rows)| clean_vol_data_with(rows, strike.0, today, policy))
        .collect();
    VolSurface::from_points(per_strike.into_iter().flatten().collect())
}

impl VolSurface {
    /// Assemble the grids from cleaned points.
    ///
    /// When several points share a (strike, maturity) cell the first one
    /// wins, and each maturity keeps the first label seen for it.
    pub fn from_points(points: Vec<VolPoint>) -> Self {
        let mut strikes: Vec<f64> = points.iter().map(|p| p.strike).collect();
        strikes.sort_by(|a, b| a.total_cmp(b));
        strikes.dedup();

        let mut labels: BTreeMap<i64, String> = BTreeMap::new();
        let mut cells: HashMap<(OrderedFloat<f64>, i64), usize> = HashMap::new();
        for (idx, p) in points.iter().enumerate() {
            labels
                .entry(p.days_to_expiry)
                .or_insert_with(|| p.expiration.clone());
            cells
                .entry((OrderedFloat(p.strike), p.days_to_expiry))
                .or_insert(idx);
        }
        let (maturities, maturity_labels): (Vec<i64>, Vec<String>) = labels.into_iter().unzip();

        let grid_for = |side: VolSide| {
            Array2::from_shape_fn((strikes.len(), maturities.len()), |(si, mi)| {
                cells
                    .get(&(OrderedFloat(strikes[si]), maturities[mi]))
                    .and_then(|&idx| points[idx].value(side))
            })
        };
        let grid_call = grid_for(VolSide::Call);
        let grid_put = grid_for(VolSide::Put);
        let grid_mid = grid_for(VolSide::Mid);

        info!(
            "Built vol surface: {} points, {} strikes, {} maturities",
            points.len(),
            strikes.len(),
            maturities.len()
        );

        Self {
            points,
            strikes,
            maturities,
            maturity_labels,
            grid_call,
            grid_put,
            grid_mid,
        }
    }

    pub fn grid(&self, side: VolSide) -> &Array2<Option<f64>> {
        match side {
            VolSide::Call => &self.grid_call,
            VolSide::Put => &self.grid_put,
            VolSide::Mid => &self.grid_mid,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points of one strike, ascending maturity
    pub fn term_structure(&self, strike: f64) -> Vec<&VolPoint> {
        let mut slice: Vec<&VolPoint> = self.points.iter().filter(|p| p.strike == strike).collect();
        slice.sort_by_key(|p| p.days_to_expiry);
        slice
    }

    /// Interpolated vol at (strike, days to expiry)
    pub fn interpolate(&self, strike: f64, days_to_expiry: f64, side: VolSide) -> Option<f64> {
        interpolate_vol(self, strike, days_to_expiry, side)
    }

    /// Interpolated vol with the maturity given as an ISO `YYYY-MM-DD` date
    pub fn interpolate_at_date(
        &self,
        strike: f64,
        expiry: &str,
        side: VolSide,
        today: NaiveDate,
    ) -> Option<f64> {
        let days = date_string_to_days(expiry, today)?;
        self.interpolate(strike, days as f64, side)
    }

    /// Copy of one grid with missing cells filled for display
    pub fn filled(&self, side: VolSide) -> Array2<Option<f64>> {
        fill_missing(self.grid(side), &self.strikes, &self.maturities)
    }
}

/// Bilinear interpolation on one grid of the surface.
///
/// Queries outside the axes are clamped to the edge. A query landing exactly
/// on a present cell returns that cell. Otherwise, with all four corners
/// present the result is interpolated in strike then maturity; with one to
/// three corners it is their plain mean; with none it is `None`.
pub fn interpolate_vol(
    surface: &VolSurface,
    strike: f64,
    days_to_expiry: f64,
    side: VolSide,
) -> Option<f64> {
    let maturities: Vec<f64> = surface.maturities.iter().map(|&m| m as f64).collect();
    let (s0, s1) = find_bounds(&surface.strikes, strike)?;
    let (m0, m1) = find_bounds(&maturities, days_to_expiry)?;
    let ts = weight(&surface.strikes, s0, s1, strike);
    let tm = weight(&maturities, m0, m1, days_to_expiry);

    let grid = surface.grid(side);
    if let (Some(si), Some(mi)) = (on_node(s0, s1, ts), on_node(m0, m1, tm)) {
        if let Some(v) = grid[[si, mi]] {
            return Some(v);
        }
    }

    let v00 = grid[[s0, m0]];
    let v01 = grid[[s0, m1]];
    let v10 = grid[[s1, m0]];
    let v11 = grid[[s1, m1]];

    if s0 == s1 && m0 == m1 {
        return v00;
    }
    if s0 == s1 {
        return lerp(v00, v01, tm);
    }
    if m0 == m1 {
        return lerp(v00, v10, ts);
    }

    match (v00, v01, v10, v11) {
        (Some(v00), Some(v01), Some(v10), Some(v11)) => {
            let near = v00 * (1.0 - ts) + v10 * ts;
            let far = v01 * (1.0 - ts) + v11 * ts;
            Some(near * (1.0 - tm) + far * tm)
        }
        corners => {
            let present: Vec<f64> = [corners.0, corners.1, corners.2, corners.3]
                .into_iter()
                .flatten()
                .collect();
            if present.is_empty() {
                return None;
            }
            Some(present.iter().sum::<f64>() / present.len() as f64)
        }
    }
}

/// Position of `value` between `axis[lo]` and `axis[hi]`; zero when clamped
fn weight(axis: &[f64], lo: usize, hi: usize, value: f64) -> f64 {
    if lo == hi {
        0.0
    } else {
        (value - axis[lo]) / (axis[hi] - axis[lo])
    }
}

/// Index of the bracket end the query sits on, if any
fn on_node(lo: usize, hi: usize, t: f64) -> Option<usize> {
    if t == 0.0 {
        Some(lo)
    } else if t == 1.0 {
        Some(hi)
    } else {
        None
    }
}

/// Linear step between two cells; a single present cell is returned as is
fn lerp(a: Option<f64>, b: Option<f64>, t: f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + t * (b - a)),
        (a, b) => a.or(b),
    }
}

/// Indices of the sorted axis values bracketing `value`, clamped to the edges.
///
/// An interior value equal to an axis point brackets it from below, so the
/// neighbouring row or column still takes part when that cell is missing.
fn find_bounds(axis: &[f64], value: f64) -> Option<(usize, usize)> {
    let last = axis.len().checked_sub(1)?;
    if value.is_nan() {
        return None;
    }
    if value <= axis[0] {
        return Some((0, 0));
    }
    if value >= axis[last] {
        return Some((last, last));
    }
    axis.windows(2)
        .position(|w| w[0] <= value && value <= w[1])
        .map(|i| (i, i + 1))
        .or(Some((last, last)))
}
