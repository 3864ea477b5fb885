//! Error types for the smi-drought crate.

use smi_grid::GridError;

/// Error type for all fallible operations in the smi-drought crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DroughtError {
    /// Returned when a configuration parameter is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when an input does not match the expected shape.
    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Name of the offending input.
        what: String,
        /// Expected extent.
        expected: usize,
        /// Actual extent.
        got: usize,
    },

    /// Returned when the event registry violates its own invariants. This is
    /// a logic defect and aborts the run.
    #[error("clustering inconsistency: {reason}")]
    ClusteringInconsistency {
        /// Description of the violated invariant.
        reason: String,
    },

    /// Propagated grid error.
    #[error(transparent)]
    Grid(#[from] GridError),
}
