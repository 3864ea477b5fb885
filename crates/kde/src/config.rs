//! Configuration for bandwidth selection and density estimation.

use crate::error::KdeError;

/// Method used to choose the kernel bandwidth of each (cell, calendar step).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandwidthMethod {
    /// Minimise the unbiased leave-one-out cross-validation score.
    #[default]
    CrossValidation,
    /// Silverman's robust rule of thumb (closed form, no optimisation).
    RuleOfThumb,
}

/// Configuration for kernel density estimation.
///
/// Use the builder methods to customise parameters.
///
/// # Example
///
/// ```
/// use smi_kde::{BandwidthMethod, KdeConfig};
///
/// let config = KdeConfig::new()
///     .with_method(BandwidthMethod::RuleOfThumb)
///     .with_window(15);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct KdeConfig {
    method: BandwidthMethod,
    min_samples: usize,
    min_cv_samples: usize,
    window: usize,
    n_candidates: usize,
    max_iters: u64,
}

impl KdeConfig {
    /// Creates a new configuration with defaults.
    ///
    /// Defaults: `method = CrossValidation`, `min_samples = 2`,
    /// `min_cv_samples = 10`, `window = 0`, `n_candidates = 25`,
    /// `max_iters = 100`.
    pub fn new() -> Self {
        Self {
            method: BandwidthMethod::CrossValidation,
            min_samples: 2,
            min_cv_samples: 10,
            window: 0,
            n_candidates: 25,
            max_iters: 100,
        }
    }

    // --- Builder methods ---

    /// Sets the bandwidth selection method.
    pub fn with_method(mut self, m: BandwidthMethod) -> Self {
        self.method = m;
        self
    }

    /// Sets the minimum number of valid values for a usable estimate.
    pub fn with_min_samples(mut self, n: usize) -> Self {
        self.min_samples = n;
        self
    }

    /// Sets the minimum number of valid values for cross-validation. Smaller
    /// samples fall back to the rule of thumb.
    pub fn with_min_cv_samples(mut self, n: usize) -> Self {
        self.min_cv_samples = n;
        self
    }

    /// Sets the half-width (in calendar steps) of the circular seasonal
    /// window pooled into each calendar step's sample.
    pub fn with_window(mut self, w: usize) -> Self {
        self.window = w;
        self
    }

    /// Sets the number of log-spaced candidates scanned before refinement.
    pub fn with_n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n;
        self
    }

    /// Sets the iteration limit of the bandwidth refinement.
    pub fn with_max_iters(mut self, n: u64) -> Self {
        self.max_iters = n;
        self
    }

    // --- Accessors ---

    /// Returns the bandwidth selection method.
    pub fn method(&self) -> BandwidthMethod {
        self.method
    }

    /// Returns the minimum number of valid values for a usable estimate.
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Returns the minimum number of valid values for cross-validation.
    pub fn min_cv_samples(&self) -> usize {
        self.min_cv_samples
    }

    /// Returns the seasonal window half-width.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Returns the number of scanned bandwidth candidates.
    pub fn n_candidates(&self) -> usize {
        self.n_candidates
    }

    /// Returns the iteration limit of the bandwidth refinement.
    pub fn max_iters(&self) -> u64 {
        self.max_iters
    }

    /// Validates this configuration.
    ///
    /// Checks that `min_samples >= 2`, `min_cv_samples >= min_samples`,
    /// `n_candidates >= 3` and `max_iters >= 1`.
    pub fn validate(&self) -> Result<(), KdeError> {
        if self.min_samples < 2 {
            return Err(KdeError::InvalidConfig {
                reason: format!("min_samples must be >= 2, got {}", self.min_samples),
            });
        }

        if self.min_cv_samples < self.min_samples {
            return Err(KdeError::InvalidConfig {
                reason: format!(
                    "min_cv_samples ({}) must be >= min_samples ({})",
                    self.min_cv_samples, self.min_samples
                ),
            });
        }

        if self.n_candidates < 3 {
            return Err(KdeError::InvalidConfig {
                reason: format!("n_candidates must be >= 3, got {}", self.n_candidates),
            });
        }

        if self.max_iters < 1 {
            return Err(KdeError::InvalidConfig {
                reason: "max_iters must be >= 1, got 0".to_string(),
            });
        }

        Ok(())
    }

    /// Validates the seasonal window against a calendar resolution.
    pub(crate) fn validate_window(&self, steps_per_year: usize) -> Result<(), KdeError> {
        if 2 * self.window + 1 > steps_per_year {
            return Err(KdeError::InvalidConfig {
                reason: format!(
                    "window {} spans more than the {} calendar steps of a year",
                    self.window, steps_per_year
                ),
            });
        }
        Ok(())
    }
}

impl Default for KdeConfig {
    fn default() -> Self {
        Self::new()
    }
}
