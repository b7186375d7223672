//! Gap filling for display grids
//!
//! Produces a copy of a `[strike, maturity]` grid where each missing cell is
//! replaced by an inverse-distance weighted average of the nearest known cell
//! in each of the four axis directions.

use ndarray::Array2;

/// Weight used when a neighbour sits at zero distance on its axis
const COINCIDENT_WEIGHT: f64 = 1000.0;

/// Walk directions as (strike step, maturity step): lower strike, higher
/// strike, shorter maturity, longer maturity
const DIRECTIONS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Fill every missing cell of `grid` from its nearest axis-aligned neighbours.
///
/// `strikes` and `maturities` are the coordinate values of the grid rows and
/// columns. Cells with no known neighbour in any direction stay `None`.
/// The source grid is left untouched.
pub fn fill_missing(
    grid: &Array2<Option<f64>>,
    strikes: &[f64],
    maturities: &[i64],
) -> Array2<Option<f64>> {
    let (n_strikes, n_maturities) = grid.dim();
    let mut out = grid.clone();
    if n_strikes == 0 || n_maturities == 0 {
        return out;
    }
    debug_assert_eq!(n_strikes, strikes.len());
    debug_assert_eq!(n_maturities, maturities.len());

    for ((si, mi), cell) in out.indexed_iter_mut() {
        if cell.is_none() {
            *cell = weighted_fill(grid, strikes, maturities, si, mi);
        }
    }

    out
}

fn weighted_fill(
    grid: &Array2<Option<f64>>,
    strikes: &[f64],
    maturities: &[i64],
    si: usize,
    mi: usize,
) -> Option<f64> {
    let neighbours: Vec<(f64, f64)> = DIRECTIONS
        .iter()
        .filter_map(|&(ds, dm)| {
            let (idx, value) = nearest_known(grid, si, mi, ds, dm)?;
            let distance = if ds != 0 {
                (strikes[si] - strikes[idx]).abs()
            } else {
                (maturities[mi] - maturities[idx]).abs() as f64
            };
            let weight = if distance > 0.0 {
                1.0 / distance
            } else {
                COINCIDENT_WEIGHT
            };
            Some((value, weight))
        })
        .collect();

    if neighbours.is_empty() {
        return None;
    }

    let total_weight: f64 = neighbours.iter().map(|(_, w)| w).sum();
    let weighted: f64 = neighbours.iter().map(|(v, w)| v * w).sum();
    Some(weighted / total_weight)
}

/// Index along the walked axis and value of the first known cell in one direction
fn nearest_known(
    grid: &Array2<Option<f64>>,
    si: usize,
    mi: usize,
    ds: isize,
    dm: isize,
) -> Option<(usize, f64)> {
    let (n_strikes, n_maturities) = grid.dim();
    let mut s = si as isize + ds;
    let mut m = mi as isize + dm;

    while s >= 0 && m >= 0 && (s as usize) < n_strikes && (m as usize) < n_maturities {
        if let Some(v) = grid[[s as usize, m as usize]] {
            let idx = if ds != 0 { s } else { m };
            return Some((idx as usize, v));
        }
        s += ds;
        m += dm;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn single_neighbour_is_copied() {
        // Column of one strike: only a longer maturity is known
        let grid = array![[None, Some(25.0)]];
        let filled = fill_missing(&grid, &[100.0], &[10, 40]);
        assert_eq!(filled[[0, 0]], Some(25.0));
        assert_eq!(filled[[0, 1]], Some(25.0));
    }

    #[test]
    fn inverse_distance_weights() {
        // Missing middle maturity, neighbours at distance 10 and 30
        let grid = array![[Some(20.0), None, Some(40.0)]];
        let filled = fill_missing(&grid, &[100.0], &[10, 20, 50]);
        let expected = (20.0 / 10.0 + 40.0 / 30.0) / (1.0 / 10.0 + 1.0 / 30.0);
        assert_abs_diff_eq!(filled[[0, 1]].unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn mixes_both_axes_and_skips_gaps() {
        let grid = array![
            [Some(10.0), None, None],
            [None, None, Some(30.0)],
        ];
        let filled = fill_missing(&grid, &[90.0, 110.0], &[7, 14, 28]);
        // [1, 1]: lower strike column holds None at [0, 1], so nothing on that
        // line; shorter maturity is None, longer maturity is 30 at distance 14
        assert_abs_diff_eq!(filled[[1, 1]].unwrap(), 30.0, epsilon = 1e-12);
        // [0, 1]: shorter maturity 10 at distance 7, no strike neighbour,
        // longer maturity walk skips [0, 2] which is also missing
        assert_abs_diff_eq!(filled[[0, 1]].unwrap(), 10.0, epsilon = 1e-12);
        assert_eq!(grid[[0, 1]], None);
    }

    #[test]
    fn isolated_cells_stay_missing() {
        let grid: Array2<Option<f64>> = Array2::from_elem((2, 2), None);
        let filled = fill_missing(&grid, &[1.0, 2.0], &[1, 2]);
        assert!(filled.iter().all(Option::is_none));

        let empty: Array2<Option<f64>> = Array2::from_elem((0, 0), None);
        assert_eq!(fill_missing(&empty, &[], &[]).dim(), (0, 0));
    }
}
