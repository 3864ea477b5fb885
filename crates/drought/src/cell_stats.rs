//! Per-cell drought statistics over the evaluation period.

use ndarray::ArrayView2;
use serde::Serialize;
use smi_grid::NODATA;

use crate::error::DroughtError;
use crate::indicator::{DroughtFlag, IndicatorField};

/// Drought statistics of every cell, in packed cell order.
///
/// A spell is a maximal run of consecutive drought steps; no-data steps end
/// a spell. Cells without any valid step report [`NODATA`] for the
/// drought fraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellDroughtStats {
    /// Number of drought spells.
    pub n_spells: Vec<usize>,
    /// Mean spell length in time steps (`0` without spells).
    pub mean_duration: Vec<f64>,
    /// Mean deficit sum per spell (`0` without spells).
    pub mean_severity: Vec<f64>,
    /// Fraction of valid steps under drought.
    pub drought_fraction: Vec<f64>,
}

/// Computes [`CellDroughtStats`] from an indicator field and the SMI it was
/// derived from.
///
/// # Errors
///
/// Returns [`DroughtError::ShapeMismatch`] if the shapes differ.
pub fn cell_statistics(
    indicator: &IndicatorField,
    smi: ArrayView2<'_, f64>,
) -> Result<CellDroughtStats, DroughtError> {
    if smi.dim() != (indicator.n_cells(), indicator.n_steps()) {
        return Err(DroughtError::ShapeMismatch {
            what: "SMI entries".to_string(),
            expected: indicator.n_cells() * indicator.n_steps(),
            got: smi.len(),
        });
    }
    let threshold = indicator.threshold();
    let n = indicator.n_cells();
    let mut stats = CellDroughtStats {
        n_spells: Vec::with_capacity(n),
        mean_duration: Vec::with_capacity(n),
        mean_severity: Vec::with_capacity(n),
        drought_fraction: Vec::with_capacity(n),
    };

    for (cell, flags) in indicator.flags().rows().into_iter().enumerate() {
        let mut spells = 0usize;
        let mut drought_steps = 0usize;
        let mut valid_steps = 0usize;
        let mut deficit = 0.0;
        let mut in_spell = false;

        for (t, &flag) in flags.iter().enumerate() {
            match flag {
                DroughtFlag::Drought => {
                    if !in_spell {
                        spells += 1;
                        in_spell = true;
                    }
                    drought_steps += 1;
                    valid_steps += 1;
                    deficit += threshold - smi[[cell, t]];
                }
                DroughtFlag::Normal => {
                    in_spell = false;
                    valid_steps += 1;
                }
                DroughtFlag::NoData => in_spell = false,
            }
        }

        let (mean_duration, mean_severity) = if spells > 0 {
            (
                drought_steps as f64 / spells as f64,
                deficit / spells as f64,
            )
        } else {
            (0.0, 0.0)
        };
        stats.n_spells.push(spells);
        stats.mean_duration.push(mean_duration);
        stats.mean_severity.push(mean_severity);
        stats.drought_fraction.push(if valid_steps > 0 {
            drought_steps as f64 / valid_steps as f64
        } else {
            NODATA
        });
    }
    Ok(stats)
}
