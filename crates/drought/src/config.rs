//! Configuration for drought detection, cluster tracking and SAD analysis.

use crate::error::DroughtError;

/// Configuration for the drought stages of the pipeline.
///
/// # Example
///
/// ```
/// use smi_drought::DroughtConfig;
///
/// let config = DroughtConfig::new()
///     .with_threshold(0.2)
///     .with_th_cell_clus(4)
///     .with_n_cell_inter(2)
///     .with_sad_durations(vec![3, 6]);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DroughtConfig {
    threshold: f64,
    th_cell_clus: usize,
    n_cell_inter: usize,
    sad_durations: Vec<usize>,
    delta_area: usize,
    sad_percentiles: Vec<f64>,
}

impl DroughtConfig {
    /// Creates a new configuration with defaults.
    ///
    /// Defaults: `threshold = 0.2`, `th_cell_clus = 1`, `n_cell_inter = 1`,
    /// `sad_durations = [3, 6, 9, 12]`, `delta_area = 10`,
    /// `sad_percentiles = [0.5, 0.75, 0.9, 0.95, 0.99]`.
    pub fn new() -> Self {
        Self {
            threshold: 0.2,
            th_cell_clus: 1,
            n_cell_inter: 1,
            sad_durations: vec![3, 6, 9, 12],
            delta_area: 10,
            sad_percentiles: vec![0.5, 0.75, 0.9, 0.95, 0.99],
        }
    }

    // --- Builder methods ---

    /// Sets the SMI threshold below which a cell is in drought.
    pub fn with_threshold(mut self, t: f64) -> Self {
        self.threshold = t;
        self
    }

    /// Sets the minimum number of cells of a cluster.
    pub fn with_th_cell_clus(mut self, n: usize) -> Self {
        self.th_cell_clus = n;
        self
    }

    /// Sets the minimum number of shared cells that links a cluster to an
    /// event of the previous step.
    pub fn with_n_cell_inter(mut self, n: usize) -> Self {
        self.n_cell_inter = n;
        self
    }

    /// Sets the durations (in time steps) of the SAD analysis.
    pub fn with_sad_durations(mut self, d: Vec<usize>) -> Self {
        self.sad_durations = d;
        self
    }

    /// Sets the width (in cells) of the SAD area bins.
    pub fn with_delta_area(mut self, n: usize) -> Self {
        self.delta_area = n;
        self
    }

    /// Sets the probabilities of the SAD percentile curves.
    pub fn with_sad_percentiles(mut self, p: Vec<f64>) -> Self {
        self.sad_percentiles = p;
        self
    }

    // --- Accessors ---

    /// Returns the drought threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the minimum cluster size.
    pub fn th_cell_clus(&self) -> usize {
        self.th_cell_clus
    }

    /// Returns the minimum overlap linking clusters across steps.
    pub fn n_cell_inter(&self) -> usize {
        self.n_cell_inter
    }

    /// Returns the SAD durations.
    pub fn sad_durations(&self) -> &[usize] {
        &self.sad_durations
    }

    /// Returns the SAD area bin width.
    pub fn delta_area(&self) -> usize {
        self.delta_area
    }

    /// Returns the SAD percentile probabilities.
    pub fn sad_percentiles(&self) -> &[f64] {
        &self.sad_percentiles
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), DroughtError> {
        validate_threshold(self.threshold)?;

        if self.th_cell_clus < 1 {
            return Err(DroughtError::InvalidConfig {
                reason: "th_cell_clus must be >= 1, got 0".to_string(),
            });
        }

        if self.n_cell_inter < 1 {
            return Err(DroughtError::InvalidConfig {
                reason: "n_cell_inter must be >= 1, got 0".to_string(),
            });
        }

        if self.sad_durations.contains(&0) {
            return Err(DroughtError::InvalidConfig {
                reason: "sad_durations must all be >= 1".to_string(),
            });
        }

        if self.delta_area < 1 {
            return Err(DroughtError::InvalidConfig {
                reason: "delta_area must be >= 1, got 0".to_string(),
            });
        }

        if let Some(p) = self
            .sad_percentiles
            .iter()
            .find(|p| !(0.0..=1.0).contains(*p))
        {
            return Err(DroughtError::InvalidConfig {
                reason: format!("sad_percentiles must lie in [0, 1], got {p}"),
            });
        }

        Ok(())
    }
}

impl Default for DroughtConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that a drought threshold lies in (0, 1].
pub(crate) fn validate_threshold(threshold: f64) -> Result<(), DroughtError> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(DroughtError::InvalidConfig {
            reason: format!("threshold must lie in (0, 1], got {threshold}"),
        });
    }
    Ok(())
}
