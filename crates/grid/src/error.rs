//! Error types for the smi-grid crate.

/// Error type for all fallible operations in the smi-grid crate.
///
/// Every variant describes an inconsistent grid or input shape, which the
/// pipeline treats as a fatal configuration error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    /// Returned when a grid has zero rows or zero columns.
    #[error("grid must have at least one row and one column, got {rows}x{cols}")]
    EmptyGrid {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },

    /// Returned when the mask marks no cell as valid.
    #[error("mask contains no valid cells")]
    EmptyMask,

    /// Returned when an array does not match the expected grid or cell shape.
    #[error("shape mismatch for {what}: expected {expected} elements, got {got}")]
    ShapeMismatch {
        /// Name of the offending input.
        what: String,
        /// Expected number of elements.
        expected: usize,
        /// Actual number of elements.
        got: usize,
    },
}
