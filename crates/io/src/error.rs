//! Error types for smi-io.

use std::path::PathBuf;

/// Error type for all fallible operations in the smi-io crate.
///
/// This enum covers file-system failures, NetCDF and JSON errors, time-axis
/// conversion issues, and shape mismatches between files and the grid mask.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when a required file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path that could not be found.
        path: PathBuf,
    },

    /// Wraps an error originating from the NetCDF library.
    #[error("netcdf error: {reason}")]
    Netcdf {
        /// Description of the underlying NetCDF failure.
        reason: String,
    },

    /// Wraps a JSON serialization error.
    #[error("json error: {reason}")]
    Json {
        /// Description of the underlying serialization failure.
        reason: String,
    },

    /// Wraps an operating-system I/O error.
    #[error("i/o error: {reason}")]
    Io {
        /// Description of the underlying failure.
        reason: String,
    },

    /// Wraps an error originating from the smi-calendar crate.
    #[error("calendar error: {reason}")]
    Calendar {
        /// Description of the underlying calendar failure.
        reason: String,
    },

    /// Wraps an error originating from the smi-grid or smi-kde crates.
    #[error("grid error: {reason}")]
    Grid {
        /// Description of the underlying failure.
        reason: String,
    },

    /// Returned when a required variable is not present in a file.
    #[error("variable '{name}' not found in {}", path.display())]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
        /// Path to the file that was inspected.
        path: PathBuf,
    },

    /// Returned when a dimension has an unexpected size.
    #[error("dimension '{name}' mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Name of the dimension.
        name: String,
        /// Expected size.
        expected: usize,
        /// Actual size.
        got: usize,
    },

    /// Returned when a time value cannot be parsed or is out of range.
    #[error("invalid time: {reason}")]
    InvalidTime {
        /// Description of the time parsing issue.
        reason: String,
    },
}

impl From<netcdf::Error> for IoError {
    fn from(e: netcdf::Error) -> Self {
        IoError::Netcdf {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json {
            reason: e.to_string(),
        }
    }
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Io {
            reason: e.to_string(),
        }
    }
}

impl From<smi_calendar::CalendarError> for IoError {
    fn from(e: smi_calendar::CalendarError) -> Self {
        IoError::Calendar {
            reason: e.to_string(),
        }
    }
}

impl From<smi_grid::GridError> for IoError {
    fn from(e: smi_grid::GridError) -> Self {
        IoError::Grid {
            reason: e.to_string(),
        }
    }
}

impl From<smi_kde::KdeError> for IoError {
    fn from(e: smi_kde::KdeError) -> Self {
        IoError::Grid {
            reason: e.to_string(),
        }
    }
}
