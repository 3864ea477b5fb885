//! Error types for the smi-kde crate.

/// Error type for all fallible operations in the smi-kde crate.
///
/// These are configuration-level failures that abort a run. Per-cell
/// estimation failures are not errors: they are recorded as
/// [`BandwidthStatus::Unusable`](crate::BandwidthStatus::Unusable) entries
/// and counted in [`EstimationSummary`](crate::EstimationSummary).
#[derive(Debug, Clone, thiserror::Error)]
pub enum KdeError {
    /// Returned when a matrix does not have the expected shape.
    #[error("shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Name of the offending input.
        what: String,
        /// Expected extent.
        expected: usize,
        /// Actual extent.
        got: usize,
    },

    /// Returned when the estimation and evaluation periods disagree.
    #[error("inconsistent periods: {reason}")]
    InconsistentPeriods {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a configuration parameter is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when an input matrix has no cells or no time steps.
    #[error("input data is empty")]
    EmptyData,
}
