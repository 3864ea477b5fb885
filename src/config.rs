use std::path::PathBuf;

use serde::Deserialize;

/// Top-level run configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmiConfig {
    /// Worker threads for per-cell estimation (default: all cores).
    #[serde(default)]
    pub threads: Option<usize>,

    /// I/O settings.
    #[serde(default)]
    pub io: IoConfig,

    /// Estimation, evaluation and output periods.
    #[serde(default)]
    pub period: PeriodToml,

    /// Kernel density settings.
    #[serde(default)]
    pub kde: KdeToml,

    /// Drought detection and SAD settings.
    #[serde(default)]
    pub drought: DroughtToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoConfig {
    pub input: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_sm_var")]
    pub sm_var: String,
    #[serde(default = "default_time_var")]
    pub time_var: String,
    #[serde(default)]
    pub mask_var: Option<String>,
    #[serde(default)]
    pub basin_var: Option<String>,
    /// Bandwidths from a previous run; skips estimation when set.
    #[serde(default)]
    pub bandwidth_file: Option<PathBuf>,
    /// Also write soil moisture reconstructed from SMI.
    #[serde(default)]
    pub write_inverted: bool,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: default_output_dir(),
            sm_var: default_sm_var(),
            time_var: default_time_var(),
            mask_var: None,
            basin_var: None,
            bandwidth_file: None,
            write_inverted: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
fn default_sm_var() -> String {
    "SM".to_string()
}
fn default_time_var() -> String {
    "time".to_string()
}

/// Periods as `YYYY-MM-DD` strings. Missing bounds default to the enclosing
/// period: estimation to the whole file, evaluation to estimation, output
/// to evaluation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeriodToml {
    #[serde(default = "default_steps_per_year")]
    pub steps_per_year: usize,
    #[serde(default)]
    pub estimation_start: Option<String>,
    #[serde(default)]
    pub estimation_end: Option<String>,
    #[serde(default)]
    pub evaluation_start: Option<String>,
    #[serde(default)]
    pub evaluation_end: Option<String>,
    #[serde(default)]
    pub output_start: Option<String>,
    #[serde(default)]
    pub output_end: Option<String>,
}

impl Default for PeriodToml {
    fn default() -> Self {
        Self {
            steps_per_year: default_steps_per_year(),
            estimation_start: None,
            estimation_end: None,
            evaluation_start: None,
            evaluation_end: None,
            output_start: None,
            output_end: None,
        }
    }
}

fn default_steps_per_year() -> usize {
    12
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KdeToml {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_min_cv_samples")]
    pub min_cv_samples: usize,
    #[serde(default)]
    pub window: usize,
    #[serde(default = "default_n_candidates")]
    pub n_candidates: usize,
    #[serde(default = "default_max_iters")]
    pub max_iters: u64,
}

impl Default for KdeToml {
    fn default() -> Self {
        Self {
            method: default_method(),
            min_samples: default_min_samples(),
            min_cv_samples: default_min_cv_samples(),
            window: 0,
            n_candidates: default_n_candidates(),
            max_iters: default_max_iters(),
        }
    }
}

fn default_method() -> String {
    "cross_validation".to_string()
}
fn default_min_samples() -> usize {
    2
}
fn default_min_cv_samples() -> usize {
    10
}
fn default_n_candidates() -> usize {
    25
}
fn default_max_iters() -> u64 {
    100
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DroughtToml {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_one")]
    pub th_cell_clus: usize,
    #[serde(default = "default_one")]
    pub n_cell_inter: usize,
    #[serde(default = "default_sad_durations")]
    pub sad_durations: Vec<usize>,
    #[serde(default = "default_delta_area")]
    pub delta_area: usize,
    #[serde(default = "default_sad_percentiles")]
    pub sad_percentiles: Vec<f64>,
}

impl Default for DroughtToml {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            th_cell_clus: default_one(),
            n_cell_inter: default_one(),
            sad_durations: default_sad_durations(),
            delta_area: default_delta_area(),
            sad_percentiles: default_sad_percentiles(),
        }
    }
}

fn default_threshold() -> f64 {
    0.2
}
fn default_one() -> usize {
    1
}
fn default_sad_durations() -> Vec<usize> {
    vec![3, 6, 9, 12]
}
fn default_delta_area() -> usize {
    10
}
fn default_sad_percentiles() -> Vec<f64> {
    vec![0.5, 0.75, 0.9, 0.95, 0.99]
}
