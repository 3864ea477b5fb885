//! Per-event drought statistics.

use ndarray::ArrayView2;
use serde::Serialize;
use smi_grid::is_nodata;

use crate::error::DroughtError;
use crate::tracker::{DroughtEvent, EventRegistry};

/// Summary of one drought event.
///
/// The deficit of a cell is `threshold − SMI`. Magnitude is the mean deficit
/// per cell and step (`Σ deficit / Σ area`); severity is the total deficit
/// over the event's duration and area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventStats {
    /// Event id.
    pub id: u32,
    /// First time step.
    pub start: usize,
    /// Last time step (inclusive).
    pub end: usize,
    /// Number of time steps.
    pub duration: usize,
    /// Number of cells at each step.
    pub areas: Vec<usize>,
    /// Deficit sum at each step.
    pub deficits: Vec<f64>,
    /// Mean deficit per cell and step.
    pub magnitude: f64,
    /// Total deficit.
    pub severity: f64,
    /// Largest per-step area.
    pub peak_area: usize,
    /// Distinct cells touched.
    pub total_cells: usize,
    /// Event the first cluster split from.
    pub split_from: Option<u32>,
    /// Event that absorbed the last cluster.
    pub merged_into: Option<u32>,
}

/// Deficit `threshold − SMI` of one event cell, checked against the SMI
/// matrix. Event cells are in drought, so the deficit is positive.
pub(crate) fn cell_deficit(
    smi: ArrayView2<'_, f64>,
    threshold: f64,
    cell: usize,
    t: usize,
) -> Result<f64, DroughtError> {
    let v = smi[[cell, t]];
    if is_nodata(v) {
        return Err(DroughtError::ClusteringInconsistency {
            reason: format!("event cell {cell} has no-data SMI at step {t}"),
        });
    }
    if v >= threshold {
        return Err(DroughtError::ClusteringInconsistency {
            reason: format!(
                "event cell {cell} has SMI {v} at step {t}, not below threshold {threshold}"
            ),
        });
    }
    Ok(threshold - v)
}

/// Checks that `smi` matches the registry's shape.
pub(crate) fn check_smi_shape(
    registry: &EventRegistry,
    smi: ArrayView2<'_, f64>,
) -> Result<(), DroughtError> {
    if smi.nrows() != registry.n_cells() {
        return Err(DroughtError::ShapeMismatch {
            what: "SMI cells".to_string(),
            expected: registry.n_cells(),
            got: smi.nrows(),
        });
    }
    if smi.ncols() != registry.n_steps() {
        return Err(DroughtError::ShapeMismatch {
            what: "SMI time steps".to_string(),
            expected: registry.n_steps(),
            got: smi.ncols(),
        });
    }
    Ok(())
}

fn summarize(
    event: &DroughtEvent,
    smi: ArrayView2<'_, f64>,
    threshold: f64,
) -> Result<EventStats, DroughtError> {
    let mut deficits = Vec::with_capacity(event.duration());
    for (t, cells) in event.steps() {
        let mut sum = 0.0;
        for &c in cells {
            sum += cell_deficit(smi, threshold, c, t)?;
        }
        deficits.push(sum);
    }
    let areas = event.areas();
    let severity: f64 = deficits.iter().sum();
    let total_area: usize = areas.iter().sum();

    Ok(EventStats {
        id: event.id(),
        start: event.start(),
        end: event.end(),
        duration: event.duration(),
        magnitude: severity / total_area as f64,
        severity,
        peak_area: event.peak_area(),
        total_cells: event.footprint().len(),
        split_from: event.split_from(),
        merged_into: event.merged_into(),
        areas,
        deficits,
    })
}

/// Computes [`EventStats`] for every event of `registry`, with deficits
/// measured against the registry's threshold.
///
/// # Errors
///
/// Returns [`DroughtError::ShapeMismatch`] if `smi` does not match the
/// registry, and [`DroughtError::ClusteringInconsistency`] if an event cell
/// has no-data SMI or SMI not below the threshold.
pub fn event_statistics(
    registry: &EventRegistry,
    smi: ArrayView2<'_, f64>,
) -> Result<Vec<EventStats>, DroughtError> {
    check_smi_shape(registry, smi)?;
    registry
        .events()
        .iter()
        .map(|e| summarize(e, smi, registry.threshold()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DroughtConfig;
    use crate::indicator::drought_indicator;
    use crate::tracker::track_events;
    use approx::assert_relative_eq;
    use ndarray::array;
    use smi_grid::GridMask;

    #[test]
    fn magnitude_and_severity() {
        // 1×3 grid, 2 steps; cells 0 and 1 in drought at t0, cell 1 at t1.
        let smi = array![[0.1, 0.5], [0.15, 0.05], [0.6, 0.7]];
        let mask = GridMask::all_valid(1, 3).unwrap();
        let ind = drought_indicator(smi.view(), 0.2).unwrap();
        let reg = track_events(&mask, &ind, &DroughtConfig::new()).unwrap();
        let stats = event_statistics(&reg, smi.view()).unwrap();

        assert_eq!(stats.len(), 1);
        let s = &stats[0];
        assert_eq!((s.start, s.end, s.duration), (0, 1, 2));
        assert_eq!(s.areas, vec![2, 1]);
        assert_relative_eq!(s.deficits[0], 0.1 + 0.05, epsilon = 1e-12);
        assert_relative_eq!(s.deficits[1], 0.15, epsilon = 1e-12);
        assert_relative_eq!(s.severity, 0.3, epsilon = 1e-12);
        assert_relative_eq!(s.magnitude, 0.1, epsilon = 1e-12);
        assert_eq!(s.peak_area, 2);
        assert_eq!(s.total_cells, 2);
    }

    #[test]
    fn shape_mismatch() {
        let smi = array![[0.1, 0.5]];
        let mask = GridMask::all_valid(1, 1).unwrap();
        let ind = drought_indicator(smi.view(), 0.2).unwrap();
        let reg = track_events(&mask, &ind, &DroughtConfig::new()).unwrap();
        let wrong = array![[0.1, 0.5, 0.3]];
        assert!(matches!(
            event_statistics(&reg, wrong.view()),
            Err(DroughtError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn smi_that_disagrees_with_the_indicator_is_rejected() {
        let smi = array![[0.1, 0.15]];
        let mask = GridMask::all_valid(1, 1).unwrap();
        let ind = drought_indicator(smi.view(), 0.2).unwrap();
        let reg = track_events(&mask, &ind, &DroughtConfig::new()).unwrap();
        assert_eq!(reg.threshold(), 0.2);

        let wetter = array![[0.1, 0.35]];
        assert!(matches!(
            event_statistics(&reg, wetter.view()),
            Err(DroughtError::ClusteringInconsistency { .. })
        ));
    }
}
