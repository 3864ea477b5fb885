//! JSON drought report.

use std::path::Path;

use serde::Serialize;
use smi_drought::{CellDroughtStats, EventStats, SadTable};
use smi_grid::{BasinSeries, GridMask};
use smi_kde::EstimationSummary;
use tracing::info;

use crate::error::IoError;

/// Top-level report of a run.
#[derive(Debug, Clone, Serialize)]
pub struct DroughtReport {
    /// Run configuration and headline counts.
    pub summary: RunSummary,
    /// Outcome of bandwidth estimation and SMI mapping.
    pub estimation: EstimationReport,
    /// One entry per drought event, in id order.
    pub events: Vec<EventStats>,
    /// Severity-area-duration curves, one per duration.
    pub sad: Vec<SadTable>,
    /// Per-cell drought statistics.
    pub cells: CellReport,
    /// Basin-averaged SMI series.
    pub basins: Vec<BasinReport>,
}

/// Summary of the run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub evaluation_start: String,
    pub evaluation_end: String,
    pub steps_per_year: usize,
    pub rows: usize,
    pub cols: usize,
    pub n_cells: usize,
    pub threshold: f64,
    pub n_events: usize,
}

/// Serializable mirror of [`EstimationSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EstimationReport {
    pub n_cells: usize,
    pub n_unusable_entries: usize,
    pub n_unusable_cells: usize,
    pub n_fallback: usize,
    pub n_nodata_introduced: usize,
    pub n_clamped: usize,
}

impl From<&EstimationSummary> for EstimationReport {
    fn from(s: &EstimationSummary) -> Self {
        Self {
            n_cells: s.n_cells,
            n_unusable_entries: s.n_unusable_entries,
            n_unusable_cells: s.n_unusable_cells,
            n_fallback: s.n_fallback,
            n_nodata_introduced: s.n_nodata_introduced,
            n_clamped: s.n_clamped,
        }
    }
}

/// Per-cell statistics with the grid position of every packed cell.
#[derive(Debug, Clone, Serialize)]
pub struct CellReport {
    pub row: Vec<usize>,
    pub col: Vec<usize>,
    #[serde(flatten)]
    pub stats: CellDroughtStats,
}

impl CellReport {
    /// Attach grid coordinates from `mask` to per-cell statistics.
    pub fn new(mask: &GridMask, stats: CellDroughtStats) -> Self {
        let (row, col) = (0..mask.n_cells()).map(|c| mask.coords(c)).unzip();
        Self { row, col, stats }
    }
}

/// Basin-averaged series.
#[derive(Debug, Clone, Serialize)]
pub struct BasinReport {
    pub id: i32,
    pub n_cells: usize,
    pub values: Vec<f64>,
}

impl From<&BasinSeries> for BasinReport {
    fn from(s: &BasinSeries) -> Self {
        Self {
            id: s.id(),
            n_cells: s.n_cells(),
            values: s.values().to_vec(),
        }
    }
}

/// Serialize a report to pretty-printed JSON.
///
/// Undefined values (SAD bins without events) become `null`.
///
/// # Errors
///
/// Returns [`IoError::Json`] if serialization fails.
pub fn to_json(report: &DroughtReport) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write a report as JSON to `path`.
///
/// # Errors
///
/// Returns [`IoError::Json`] or [`IoError::Io`] on failure.
pub fn write_report(path: &Path, report: &DroughtReport) -> Result<(), IoError> {
    std::fs::write(path, to_json(report)?)?;
    info!(
        path = %path.display(),
        n_events = report.events.len(),
        n_basins = report.basins.len(),
        "wrote drought report"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> DroughtReport {
        let mask = GridMask::new(2, 2, vec![true, false, true, true]).unwrap();
        DroughtReport {
            summary: RunSummary {
                evaluation_start: "2003-01-01".to_string(),
                evaluation_end: "2003-12-31".to_string(),
                steps_per_year: 12,
                rows: 2,
                cols: 2,
                n_cells: 3,
                threshold: 0.2,
                n_events: 0,
            },
            estimation: EstimationReport::from(&EstimationSummary::default()),
            events: Vec::new(),
            sad: vec![SadTable {
                duration: 3,
                areas: vec![1],
                percentiles: vec![0.5],
                n_events: vec![0],
                values: vec![vec![f64::NAN]],
            }],
            cells: CellReport::new(
                &mask,
                CellDroughtStats {
                    n_spells: vec![1, 0, 2],
                    mean_duration: vec![2.0, 0.0, 1.5],
                    mean_severity: vec![0.1, 0.0, 0.05],
                    drought_fraction: vec![0.25, 0.0, 0.5],
                },
            ),
            basins: Vec::new(),
        }
    }

    #[test]
    fn cell_report_carries_coordinates() {
        let r = report();
        assert_eq!(r.cells.row, vec![0, 1, 1]);
        assert_eq!(r.cells.col, vec![0, 0, 1]);
    }

    #[test]
    fn json_has_sections_and_null_for_nan() {
        let json = to_json(&report()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["summary"]["n_cells"], 3);
        assert!(parsed["sad"][0]["values"][0][0].is_null());
        assert_eq!(parsed["cells"]["n_spells"][2], 2);
        assert_eq!(parsed["cells"]["row"][2], 1);
        assert!(parsed["events"].as_array().unwrap().is_empty());
    }
}
