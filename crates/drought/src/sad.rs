//! Severity-area-duration (SAD) analysis.
//!
//! For a duration `D` and an area `A`, the value of an event is the largest
//! mean deficit of its `A` most affected cells over any window of `D`
//! consecutive steps. A cell's deficit in a window is its mean over the `D`
//! steps, counting steps where the cell is outside the event as zero. Areas
//! are binned as `A_k = k · delta_area`. Percentiles of the event values are
//! taken per (duration, area bin).

use ndarray::{Array2, ArrayView2};
use serde::Serialize;
use tracing::debug;

use crate::config::DroughtConfig;
use crate::error::DroughtError;
use crate::events::{cell_deficit, check_smi_shape};
use crate::tracker::{DroughtEvent, EventRegistry, check_threshold};

/// SAD percentile curves for one duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SadTable {
    /// Window length in time steps.
    pub duration: usize,
    /// Area bins in cells (`k · delta_area`).
    pub areas: Vec<usize>,
    /// Percentile probabilities.
    pub percentiles: Vec<f64>,
    /// Number of events contributing to each area bin.
    pub n_events: Vec<usize>,
    /// `values[k][p]`: percentile `p` of the event values in area bin `k`.
    pub values: Vec<Vec<f64>>,
}

/// Deficit of every footprint cell over the event's steps; zero where the
/// cell is outside the event.
fn deficit_matrix(
    event: &DroughtEvent,
    smi: ArrayView2<'_, f64>,
    threshold: f64,
) -> Result<Array2<f64>, DroughtError> {
    let footprint = event.footprint();
    let mut out = Array2::zeros((footprint.len(), event.duration()));
    for (i, (t, cells)) in event.steps().enumerate() {
        for &c in cells {
            // Footprint and cells are both sorted.
            let row = footprint.binary_search(&c).map_err(|_| {
                DroughtError::ClusteringInconsistency {
                    reason: format!("cell {c} missing from footprint of event {}", event.id()),
                }
            })?;
            out[[row, i]] = cell_deficit(smi, threshold, c, t)?;
        }
    }
    Ok(out)
}

/// Best value of one event for every area in `areas` (ascending, each at
/// most the footprint size) and window length `duration`.
fn event_sad(deficits: &Array2<f64>, duration: usize, areas: &[usize]) -> Vec<f64> {
    let (n_cells, n_steps) = deficits.dim();
    let mut best = vec![f64::NEG_INFINITY; areas.len()];
    let mut means = vec![0.0; n_cells];

    for w in 0..=(n_steps - duration) {
        for (c, m) in means.iter_mut().enumerate() {
            let sum: f64 = (w..w + duration).map(|t| deficits[[c, t]]).sum();
            *m = sum / duration as f64;
        }
        let mut ranked = means.clone();
        ranked.sort_by(|a, b| b.total_cmp(a));

        let mut prefix = 0.0;
        let mut k = 0;
        for (n, v) in ranked.iter().enumerate() {
            prefix += v;
            while k < areas.len() && areas[k] == n + 1 {
                best[k] = best[k].max(prefix / areas[k] as f64);
                k += 1;
            }
        }
    }
    best
}

/// Computes one [`SadTable`] per configured duration.
///
/// Durations longer than every event yield a table with no area bins.
///
/// # Errors
///
/// Returns [`DroughtError`] for an invalid configuration or one whose
/// threshold differs from the registry's, an SMI matrix that does not match
/// the registry, or event cells with no-data SMI.
#[tracing::instrument(skip_all, fields(n_events = registry.len()))]
pub fn sad_analysis(
    registry: &EventRegistry,
    smi: ArrayView2<'_, f64>,
    config: &DroughtConfig,
) -> Result<Vec<SadTable>, DroughtError> {
    config.validate()?;
    check_threshold(config, registry.threshold())?;
    check_smi_shape(registry, smi)?;

    let matrices: Vec<Array2<f64>> = registry
        .events()
        .iter()
        .map(|e| deficit_matrix(e, smi, registry.threshold()))
        .collect::<Result<_, _>>()?;

    let delta = config.delta_area();
    let mut tables = Vec::with_capacity(config.sad_durations().len());
    for &duration in config.sad_durations() {
        let eligible: Vec<&Array2<f64>> = matrices
            .iter()
            .filter(|m| m.ncols() >= duration)
            .collect();
        let max_footprint = eligible.iter().map(|m| m.nrows()).max().unwrap_or(0);
        let areas: Vec<usize> = (1..=max_footprint / delta).map(|k| k * delta).collect();

        let mut samples: Vec<Vec<f64>> = vec![Vec::new(); areas.len()];
        for m in &eligible {
            let fitting = areas.partition_point(|&a| a <= m.nrows());
            let values = event_sad(m, duration, &areas[..fitting]);
            for (k, v) in values.into_iter().enumerate() {
                samples[k].push(v);
            }
        }

        let values: Vec<Vec<f64>> = samples
            .iter()
            .map(|s| {
                smi_stats::percentiles(s, config.sad_percentiles())
                    .unwrap_or_else(|| vec![f64::NAN; config.sad_percentiles().len()])
            })
            .collect();

        debug!(
            duration,
            n_eligible = eligible.len(),
            n_area_bins = areas.len(),
            "computed SAD curves"
        );
        tables.push(SadTable {
            duration,
            n_events: samples.iter().map(Vec::len).collect(),
            percentiles: config.sad_percentiles().to_vec(),
            areas,
            values,
        });
    }
    Ok(tables)
}
