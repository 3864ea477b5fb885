//! Result types for index mapping and inversion.

use ndarray::{Array2, ArrayView2};

/// Bookkeeping about per-cell estimation failures of one mapping run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EstimationSummary {
    /// Number of cells processed.
    pub n_cells: usize,
    /// Number of (cell, calendar step) entries without a usable bandwidth.
    pub n_unusable_entries: usize,
    /// Number of cells without any usable bandwidth.
    pub n_unusable_cells: usize,
    /// Number of entries that fell back to the rule of thumb.
    pub n_fallback: usize,
    /// Number of valid input values mapped to no-data because their
    /// (cell, calendar step) was unusable.
    pub n_nodata_introduced: usize,
    /// Number of inversions clamped to the search bracket.
    pub n_clamped: usize,
}

/// A mapped (cell × time step) matrix plus its estimation summary.
#[derive(Debug, Clone)]
pub struct MappedField {
    values: Array2<f64>,
    summary: EstimationSummary,
}

impl MappedField {
    pub(crate) fn new(values: Array2<f64>, summary: EstimationSummary) -> Self {
        Self { values, summary }
    }

    /// Mapped values, `NODATA` where unavailable.
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Consumes `self` and returns the owned matrix.
    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    /// Estimation summary.
    pub fn summary(&self) -> &EstimationSummary {
        &self.summary
    }
}
