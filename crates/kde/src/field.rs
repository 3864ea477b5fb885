//! Bandwidth field over (cell, calendar step) and its estimation.

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use smi_calendar::Period;
use smi_grid::{NODATA, is_nodata};
use tracing::{debug, info, warn};

use crate::bandwidth::{BandwidthStatus, select_bandwidth};
use crate::config::KdeConfig;
use crate::error::KdeError;

/// Kernel bandwidth for every (cell, calendar step), shape
/// `(n_cells, steps_per_year)`.
///
/// Usable entries are finite and strictly positive. Unusable entries hold
/// [`NODATA`].
#[derive(Debug, Clone)]
pub struct BandwidthField {
    values: Array2<f64>,
    status: Array2<BandwidthStatus>,
}

impl BandwidthField {
    /// Wraps a pre-computed bandwidth matrix of shape
    /// `(n_cells, steps_per_year)`.
    ///
    /// Finite positive entries are marked [`BandwidthStatus::Supplied`];
    /// everything else becomes [`BandwidthStatus::Unusable`] and is replaced
    /// by [`NODATA`].
    ///
    /// # Errors
    ///
    /// Returns [`KdeError::EmptyData`] if the matrix has no entries.
    pub fn from_values(mut values: Array2<f64>) -> Result<Self, KdeError> {
        if values.is_empty() {
            return Err(KdeError::EmptyData);
        }
        let status = values.mapv(|h| {
            if h.is_finite() && h > 0.0 {
                BandwidthStatus::Supplied
            } else {
                BandwidthStatus::Unusable
            }
        });
        values.zip_mut_with(&status, |h, s| {
            if !s.is_usable() {
                *h = NODATA;
            }
        });
        let field = Self { values, status };
        debug!(
            n_cells = field.n_cells(),
            n_unusable = field.n_unusable(),
            "wrapped supplied bandwidth field"
        );
        Ok(field)
    }

    /// Number of cells.
    pub fn n_cells(&self) -> usize {
        self.values.nrows()
    }

    /// Number of calendar steps per year.
    pub fn steps_per_year(&self) -> usize {
        self.values.ncols()
    }

    /// Bandwidth of `(cell, step)`, or `None` if unusable.
    pub fn get(&self, cell: usize, step: usize) -> Option<f64> {
        self.status[[cell, step]]
            .is_usable()
            .then(|| self.values[[cell, step]])
    }

    /// Status of `(cell, step)`.
    pub fn status(&self, cell: usize, step: usize) -> BandwidthStatus {
        self.status[[cell, step]]
    }

    /// Raw values, with [`NODATA`] at unusable entries.
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Status of every entry.
    pub fn statuses(&self) -> ArrayView2<'_, BandwidthStatus> {
        self.status.view()
    }

    /// Number of entries with the given status.
    pub fn count(&self, status: BandwidthStatus) -> usize {
        self.status.iter().filter(|&&s| s == status).count()
    }

    /// Number of unusable entries.
    pub fn n_unusable(&self) -> usize {
        self.count(BandwidthStatus::Unusable)
    }

    /// Number of cells with no usable entry at all.
    pub fn n_unusable_cells(&self) -> usize {
        self.status
            .rows()
            .into_iter()
            .filter(|row| row.iter().all(|s| !s.is_usable()))
            .count()
    }
}

/// Time steps of `period` pooled into the sample of each calendar step.
///
/// Entry `s` lists every `t` whose calendar step lies within circular
/// distance `window` of `s`, in ascending order.
pub(crate) fn seasonal_indices(period: &Period, window: usize) -> Vec<Vec<usize>> {
    let spy = period.steps_per_year();
    let mut out = vec![Vec::new(); spy];
    for (t, step) in period.calendar_steps().into_iter().enumerate() {
        for offset in 0..=2 * window {
            let s = (step + spy + offset - window) % spy;
            out[s].push(t);
        }
    }
    out
}

/// Valid values of one cell at the given time steps.
pub(crate) fn collect_sample(row: &[f64], steps: &[usize]) -> Vec<f64> {
    steps
        .iter()
        .map(|&t| row[t])
        .filter(|&v| !is_nodata(v))
        .collect()
}

/// Checks that `data` has one column per time step of `period`.
pub(crate) fn check_columns(
    data: ArrayView2<'_, f64>,
    period: &Period,
    what: &str,
) -> Result<(), KdeError> {
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(KdeError::EmptyData);
    }
    if data.ncols() != period.n_steps() {
        return Err(KdeError::ShapeMismatch {
            what: format!("{what} time steps"),
            expected: period.n_steps(),
            got: data.ncols(),
        });
    }
    Ok(())
}

/// Estimates the bandwidth of every (cell, calendar step) from the
/// estimation-period matrix (`n_cells × n_steps`).
///
/// Cells are processed in parallel on the rayon pool. Per-entry failures are
/// recorded as statuses, never as errors.
///
/// # Errors
///
/// Returns [`KdeError`] for an invalid configuration, an empty matrix, or a
/// column count that does not match `period`.
#[tracing::instrument(skip(estimation, period, config), fields(n_cells = estimation.nrows()))]
pub fn estimate_bandwidths(
    estimation: ArrayView2<'_, f64>,
    period: &Period,
    config: &KdeConfig,
) -> Result<BandwidthField, KdeError> {
    config.validate()?;
    config.validate_window(period.steps_per_year())?;
    check_columns(estimation, period, "estimation")?;

    let spy = period.steps_per_year();
    let seasons = seasonal_indices(period, config.window());
    let n_cells = estimation.nrows();

    let rows: Vec<Vec<(f64, BandwidthStatus)>> = (0..n_cells)
        .into_par_iter()
        .map(|cell| {
            let row = estimation.row(cell).to_vec();
            seasons
                .iter()
                .map(|steps| {
                    let sample = collect_sample(&row, steps);
                    let est = select_bandwidth(&sample, config);
                    (est.value.unwrap_or(NODATA), est.status)
                })
                .collect()
        })
        .collect();

    let mut values = Array2::from_elem((n_cells, spy), NODATA);
    let mut status = Array2::from_elem((n_cells, spy), BandwidthStatus::Unusable);
    for (cell, row) in rows.into_iter().enumerate() {
        for (step, (h, s)) in row.into_iter().enumerate() {
            values[[cell, step]] = h;
            status[[cell, step]] = s;
        }
    }

    let field = BandwidthField { values, status };
    let n_unusable = field.n_unusable();
    info!(
        n_cells,
        steps_per_year = spy,
        n_cross_validated = field.count(BandwidthStatus::CrossValidated),
        n_fallback = field.count(BandwidthStatus::Fallback),
        n_unusable,
        "estimated bandwidths"
    );
    if n_unusable > 0 {
        warn!(
            n_unusable,
            n_unusable_cells = field.n_unusable_cells(),
            "some bandwidths could not be estimated and propagate as no-data"
        );
    }
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn seasonal_indices_without_window() {
        let p = Period::from_ymd((2000, 1, 1), (2001, 12, 31), 12).unwrap();
        let idx = seasonal_indices(&p, 0);
        assert_eq!(idx.len(), 12);
        assert_eq!(idx[0], vec![0, 12]);
        assert_eq!(idx[11], vec![11, 23]);
    }

    #[test]
    fn seasonal_indices_wrap_around_year() {
        let p = Period::from_ymd((2000, 1, 1), (2000, 12, 31), 12).unwrap();
        let idx = seasonal_indices(&p, 1);
        // January pools December, January, February.
        let mut jan = idx[0].clone();
        jan.sort_unstable();
        assert_eq!(jan, vec![0, 1, 11]);
        assert!(idx.iter().all(|v| v.len() == 3));
    }

    #[test]
    fn collect_sample_skips_nodata() {
        let row = [0.1, NODATA, f64::NAN, 0.4];
        assert_eq!(collect_sample(&row, &[0, 1, 2, 3]), vec![0.1, 0.4]);
    }

    #[test]
    fn supplied_field_marks_invalid_entries() {
        let field = BandwidthField::from_values(array![[0.1, -1.0], [f64::NAN, 0.2]]).unwrap();
        assert_eq!(field.status(0, 0), BandwidthStatus::Supplied);
        assert_eq!(field.status(0, 1), BandwidthStatus::Unusable);
        assert_eq!(field.get(0, 1), None);
        assert_eq!(field.values()[[1, 0]], NODATA);
        assert_eq!(field.get(1, 1), Some(0.2));
        assert_eq!(field.n_unusable(), 2);
        assert_eq!(field.n_unusable_cells(), 0);
    }

    #[test]
    fn supplied_field_rejects_empty() {
        assert!(matches!(
            BandwidthField::from_values(Array2::zeros((0, 12))),
            Err(KdeError::EmptyData)
        ));
    }

    #[test]
    fn estimate_rejects_wrong_columns() {
        let p = Period::from_ymd((2000, 1, 1), (2000, 12, 31), 12).unwrap();
        let data = Array2::from_elem((2, 11), 0.3);
        assert!(matches!(
            estimate_bandwidths(data.view(), &p, &KdeConfig::new()),
            Err(KdeError::ShapeMismatch { expected: 12, got: 11, .. })
        ));
    }

    #[test]
    fn estimate_rejects_oversized_window() {
        let p = Period::from_ymd((2000, 1, 1), (2000, 12, 31), 12).unwrap();
        let data = Array2::from_elem((2, 12), 0.3);
        let config = KdeConfig::new().with_window(6);
        assert!(matches!(
            estimate_bandwidths(data.view(), &p, &config),
            Err(KdeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn estimate_all_nodata_cell_is_unusable() {
        let p = Period::from_ymd((2000, 1, 1), (2002, 12, 31), 12).unwrap();
        let mut data = Array2::from_elem((2, 36), NODATA);
        for t in 0..36 {
            data[[1, t]] = 0.2 + 0.01 * ((t * 7) % 5) as f64;
        }
        let field = estimate_bandwidths(data.view(), &p, &KdeConfig::new()).unwrap();
        assert_eq!(field.n_unusable_cells(), 1);
        for s in 0..12 {
            assert_eq!(field.status(0, s), BandwidthStatus::Unusable);
            assert_eq!(field.values()[[0, s]], NODATA);
        }
    }
}
