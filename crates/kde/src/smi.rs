//! Soil moisture index mapping and its inverse.
//!
//! Every cell of the evaluation matrix is mapped through the kernel CDF of
//! its (cell, calendar step) estimation sample. Cells are independent and run
//! in parallel.

use ndarray::{Array2, ArrayView2, aview1};
use rayon::prelude::*;
use smi_calendar::Period;
use smi_grid::{NODATA, is_nodata};
use tracing::{info, warn};

use crate::bandwidth::BandwidthStatus;
use crate::cdf::KernelCdf;
use crate::config::KdeConfig;
use crate::error::KdeError;
use crate::field::{BandwidthField, check_columns, collect_sample, seasonal_indices};
use crate::result::{EstimationSummary, MappedField};

/// Direction of a mapping run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Soil moisture to index.
    Forward,
    /// Index to soil moisture.
    Inverse,
}

/// Per-cell counters merged into the summary.
#[derive(Debug, Clone, Copy, Default)]
struct CellCounts {
    nodata_introduced: usize,
    clamped: usize,
}

/// Maps evaluation-period soil moisture to the soil moisture index.
///
/// `estimation` (`n_cells × est_period.n_steps()`) provides the samples the
/// bandwidths were estimated from; `evaluation`
/// (`n_cells × eval_period.n_steps()`) is mapped. No-data input and unusable
/// (cell, calendar step) entries yield `NODATA`.
///
/// # Errors
///
/// Returns [`KdeError`] if the matrices, periods and bandwidth field
/// disagree in shape or resolution.
#[tracing::instrument(skip_all, fields(n_cells = estimation.nrows(), n_steps = evaluation.ncols()))]
pub fn compute_smi(
    estimation: ArrayView2<'_, f64>,
    est_period: &Period,
    evaluation: ArrayView2<'_, f64>,
    eval_period: &Period,
    bandwidths: &BandwidthField,
    config: &KdeConfig,
) -> Result<MappedField, KdeError> {
    map_field(
        estimation,
        est_period,
        evaluation,
        eval_period,
        bandwidths,
        config,
        Direction::Forward,
    )
}

/// Reconstructs soil moisture from index values by inverting each
/// (cell, calendar step) kernel CDF.
///
/// Inversions that hit the search bracket are counted in
/// [`EstimationSummary::n_clamped`].
///
/// # Errors
///
/// Same as [`compute_smi`].
#[tracing::instrument(skip_all, fields(n_cells = estimation.nrows(), n_steps = smi.ncols()))]
pub fn invert_smi(
    smi: ArrayView2<'_, f64>,
    estimation: ArrayView2<'_, f64>,
    est_period: &Period,
    eval_period: &Period,
    bandwidths: &BandwidthField,
    config: &KdeConfig,
) -> Result<MappedField, KdeError> {
    map_field(
        estimation,
        est_period,
        smi,
        eval_period,
        bandwidths,
        config,
        Direction::Inverse,
    )
}

fn validate_inputs(
    estimation: ArrayView2<'_, f64>,
    est_period: &Period,
    source: ArrayView2<'_, f64>,
    eval_period: &Period,
    bandwidths: &BandwidthField,
    config: &KdeConfig,
) -> Result<(), KdeError> {
    config.validate()?;
    config.validate_window(est_period.steps_per_year())?;

    if !est_period.is_consistent_with(eval_period) {
        return Err(KdeError::InconsistentPeriods {
            reason: format!(
                "estimation uses {} calendar steps per year ({} calendar), evaluation {} ({})",
                est_period.steps_per_year(),
                est_period.calendar(),
                eval_period.steps_per_year(),
                eval_period.calendar()
            ),
        });
    }

    check_columns(estimation, est_period, "estimation")?;
    check_columns(source, eval_period, "evaluation")?;

    if source.nrows() != estimation.nrows() {
        return Err(KdeError::ShapeMismatch {
            what: "evaluation cells".to_string(),
            expected: estimation.nrows(),
            got: source.nrows(),
        });
    }
    if bandwidths.n_cells() != estimation.nrows() {
        return Err(KdeError::ShapeMismatch {
            what: "bandwidth cells".to_string(),
            expected: estimation.nrows(),
            got: bandwidths.n_cells(),
        });
    }
    if bandwidths.steps_per_year() != est_period.steps_per_year() {
        return Err(KdeError::ShapeMismatch {
            what: "bandwidth calendar steps".to_string(),
            expected: est_period.steps_per_year(),
            got: bandwidths.steps_per_year(),
        });
    }
    Ok(())
}

fn map_field(
    estimation: ArrayView2<'_, f64>,
    est_period: &Period,
    source: ArrayView2<'_, f64>,
    eval_period: &Period,
    bandwidths: &BandwidthField,
    config: &KdeConfig,
    direction: Direction,
) -> Result<MappedField, KdeError> {
    validate_inputs(estimation, est_period, source, eval_period, bandwidths, config)?;

    let seasons = seasonal_indices(est_period, config.window());
    let eval_steps = eval_period.calendar_steps();
    let n_cells = estimation.nrows();
    let n_steps = source.ncols();

    let rows: Vec<(Vec<f64>, CellCounts)> = (0..n_cells)
        .into_par_iter()
        .map(|cell| {
            let est_row = estimation.row(cell).to_vec();
            let mut cdfs: Vec<Option<Option<KernelCdf>>> = vec![None; seasons.len()];
            let mut counts = CellCounts::default();
            let mut out = Vec::with_capacity(n_steps);

            for (t, &step) in eval_steps.iter().enumerate() {
                let x = source[[cell, t]];
                if is_nodata(x) {
                    out.push(NODATA);
                    continue;
                }
                let cdf = cdfs[step].get_or_insert_with(|| {
                    bandwidths.get(cell, step).and_then(|h| {
                        KernelCdf::new(&collect_sample(&est_row, &seasons[step]), h)
                    })
                });
                let Some(cdf) = cdf else {
                    counts.nodata_introduced += 1;
                    out.push(NODATA);
                    continue;
                };
                let mapped = match direction {
                    Direction::Forward => cdf.forward(x),
                    Direction::Inverse => cdf.inverse(x).map(|inv| {
                        if inv.clamped {
                            counts.clamped += 1;
                        }
                        inv.value
                    }),
                };
                out.push(mapped.unwrap_or(NODATA));
            }
            (out, counts)
        })
        .collect();

    let mut values = Array2::from_elem((n_cells, n_steps), NODATA);
    let mut summary = EstimationSummary {
        n_cells,
        n_unusable_entries: bandwidths.n_unusable(),
        n_unusable_cells: bandwidths.n_unusable_cells(),
        n_fallback: bandwidths.count(BandwidthStatus::Fallback),
        ..EstimationSummary::default()
    };
    for (cell, (row, counts)) in rows.into_iter().enumerate() {
        values.row_mut(cell).assign(&aview1(&row));
        summary.n_nodata_introduced += counts.nodata_introduced;
        summary.n_clamped += counts.clamped;
    }

    info!(
        ?direction,
        n_cells,
        n_steps,
        n_nodata_introduced = summary.n_nodata_introduced,
        n_clamped = summary.n_clamped,
        "mapped field"
    );
    if summary.n_nodata_introduced > 0 || summary.n_clamped > 0 {
        warn!(
            n_unusable_entries = summary.n_unusable_entries,
            n_nodata_introduced = summary.n_nodata_introduced,
            n_clamped = summary.n_clamped,
            "estimation failures in mapped field"
        );
    }
    Ok(MappedField::new(values, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::estimate_bandwidths;

    fn monthly(years: i32) -> Period {
        Period::from_ymd((2000, 1, 1), (1999 + years, 12, 31), 12).unwrap()
    }

    fn synthetic(n_cells: usize, n_steps: usize) -> Array2<f64> {
        Array2::from_shape_fn((n_cells, n_steps), |(c, t)| {
            0.3 + 0.1 * ((t as f64 * 0.7 + c as f64).sin())
        })
    }

    #[test]
    fn rejects_inconsistent_periods() {
        let est = monthly(2);
        let eval = Period::from_ymd((2000, 1, 1), (2000, 1, 31), 365).unwrap();
        let data = synthetic(2, 24);
        let field = estimate_bandwidths(data.view(), &est, &KdeConfig::new()).unwrap();
        let eval_data = synthetic(2, 31);
        assert!(matches!(
            compute_smi(data.view(), &est, eval_data.view(), &eval, &field, &KdeConfig::new()),
            Err(KdeError::InconsistentPeriods { .. })
        ));
    }

    #[test]
    fn rejects_cell_count_mismatch() {
        let est = monthly(2);
        let data = synthetic(3, 24);
        let field = estimate_bandwidths(data.view(), &est, &KdeConfig::new()).unwrap();
        let eval_data = synthetic(2, 24);
        assert!(matches!(
            compute_smi(data.view(), &est, eval_data.view(), &est, &field, &KdeConfig::new()),
            Err(KdeError::ShapeMismatch { expected: 3, got: 2, .. })
        ));
    }

    #[test]
    fn rejects_bandwidth_field_of_other_grid() {
        let est = monthly(2);
        let data = synthetic(3, 24);
        let other = BandwidthField::from_values(Array2::from_elem((4, 12), 0.1)).unwrap();
        assert!(matches!(
            compute_smi(data.view(), &est, data.view(), &est, &other, &KdeConfig::new()),
            Err(KdeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn nodata_input_stays_nodata_and_is_not_counted() {
        let est = monthly(3);
        let data = synthetic(2, 36);
        let field = estimate_bandwidths(data.view(), &est, &KdeConfig::new()).unwrap();
        let mut eval = data.clone();
        eval[[0, 5]] = NODATA;
        eval[[1, 7]] = f64::NAN;
        let out = compute_smi(data.view(), &est, eval.view(), &est, &field, &KdeConfig::new())
            .unwrap();
        assert_eq!(out.values()[[0, 5]], NODATA);
        assert_eq!(out.values()[[1, 7]], NODATA);
        assert_eq!(out.summary().n_nodata_introduced, 0);
    }

    #[test]
    fn unusable_bandwidth_introduces_nodata() {
        let est = monthly(2);
        let data = synthetic(1, 24);
        let mut h = Array2::from_elem((1, 12), 0.05);
        h[[0, 3]] = 0.0;
        let field = BandwidthField::from_values(h).unwrap();
        let out = compute_smi(data.view(), &est, data.view(), &est, &field, &KdeConfig::new())
            .unwrap();
        assert_eq!(out.values()[[0, 3]], NODATA);
        assert_eq!(out.values()[[0, 15]], NODATA);
        assert_eq!(out.summary().n_nodata_introduced, 2);
        assert_eq!(out.summary().n_unusable_entries, 1);
    }

    #[test]
    fn inversion_counts_clamped_requests() {
        let est = monthly(2);
        let data = synthetic(1, 24);
        let field = BandwidthField::from_values(Array2::from_elem((1, 12), 0.05)).unwrap();
        let mut smi = Array2::from_elem((1, 24), 0.5);
        smi[[0, 0]] = 0.0;
        smi[[0, 1]] = 1.0;
        let out = invert_smi(smi.view(), data.view(), &est, &est, &field, &KdeConfig::new())
            .unwrap();
        assert_eq!(out.summary().n_clamped, 2);
        assert!(out.values().iter().all(|v| v.is_finite() && *v != NODATA));
    }
}
