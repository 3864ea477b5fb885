//! Drought indicator: SMI thresholded into per-cell drought flags.

use ndarray::{Array2, ArrayView2};
use smi_grid::is_nodata;
use tracing::debug;

use crate::config::validate_threshold;
use crate::error::DroughtError;

/// Drought state of one (cell, time step).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum DroughtFlag {
    /// SMI is no-data; excluded from every count.
    NoData = -1,
    /// SMI at or above the threshold.
    Normal = 0,
    /// SMI below the threshold.
    Drought = 1,
}

impl DroughtFlag {
    /// Integer code written to output files.
    pub fn code(self) -> i8 {
        self as i8
    }

    /// Returns `true` for [`DroughtFlag::Drought`].
    pub fn is_drought(self) -> bool {
        self == Self::Drought
    }
}

/// Drought flags of every (cell, time step), shape `(n_cells, n_steps)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorField {
    flags: Array2<DroughtFlag>,
    threshold: f64,
}

impl IndicatorField {
    /// Wraps a pre-computed flag matrix.
    pub fn from_flags(flags: Array2<DroughtFlag>, threshold: f64) -> Self {
        Self { flags, threshold }
    }

    /// Number of cells.
    pub fn n_cells(&self) -> usize {
        self.flags.nrows()
    }

    /// Number of time steps.
    pub fn n_steps(&self) -> usize {
        self.flags.ncols()
    }

    /// Threshold the field was computed with.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Flag of `(cell, t)`.
    pub fn flag(&self, cell: usize, t: usize) -> DroughtFlag {
        self.flags[[cell, t]]
    }

    /// All flags.
    pub fn flags(&self) -> ArrayView2<'_, DroughtFlag> {
        self.flags.view()
    }

    /// Flags as integer codes (`1`, `0`, `-1`).
    pub fn codes(&self) -> Array2<i8> {
        self.flags.mapv(DroughtFlag::code)
    }

    /// Drought mask of time step `t` in packed cell order.
    pub fn drought_cells(&self, t: usize) -> Vec<bool> {
        self.flags.column(t).iter().map(|f| f.is_drought()).collect()
    }

    /// Number of drought cells at time step `t`.
    pub fn n_drought(&self, t: usize) -> usize {
        self.flags.column(t).iter().filter(|f| f.is_drought()).count()
    }

    /// Number of no-data entries.
    pub fn n_nodata(&self) -> usize {
        self.flags.iter().filter(|&&f| f == DroughtFlag::NoData).count()
    }
}

/// Thresholds an SMI matrix: `Drought` where `SMI < threshold`, `Normal`
/// otherwise, `NoData` for no-data SMI.
///
/// # Errors
///
/// Returns [`DroughtError::InvalidConfig`] if `threshold` is not in (0, 1].
pub fn drought_indicator(
    smi: ArrayView2<'_, f64>,
    threshold: f64,
) -> Result<IndicatorField, DroughtError> {
    validate_threshold(threshold)?;
    let flags = smi.mapv(|v| {
        if is_nodata(v) {
            DroughtFlag::NoData
        } else if v < threshold {
            DroughtFlag::Drought
        } else {
            DroughtFlag::Normal
        }
    });
    let field = IndicatorField { flags, threshold };
    debug!(
        n_cells = field.n_cells(),
        n_steps = field.n_steps(),
        n_nodata = field.n_nodata(),
        "computed drought indicator"
    );
    Ok(field)
}
