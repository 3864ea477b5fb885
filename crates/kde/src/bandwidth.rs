//! Per-sample bandwidth selection.
//!
//! Cross-validation scans a log-spaced grid of candidates for the smallest
//! unbiased cross-validation score, then refines the bracketing interval
//! with Brent's method from the `argmin` crate.
//!
//! **Not part of the public API** beyond [`BandwidthStatus`].

use argmin::core::{CostFunction, Executor};
use argmin::solver::brent::BrentOpt;

use crate::config::{BandwidthMethod, KdeConfig};
use crate::kernel::ucv_score;

/// Spreads at or below this value (relative to the sample magnitude) are
/// treated as a constant sample.
const SPREAD_EPS: f64 = 1e-10;

/// How the bandwidth of one (cell, calendar step) was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BandwidthStatus {
    /// Minimiser of the cross-validation score.
    CrossValidated,
    /// Rule of thumb, as configured.
    RuleOfThumb,
    /// Rule of thumb used because cross-validation was not possible (too few
    /// values or no finite score).
    Fallback,
    /// Taken from a pre-computed bandwidth field.
    Supplied,
    /// No usable estimate: too few values, zero spread, or an invalid
    /// supplied value. Propagates as no-data.
    #[default]
    Unusable,
}

impl BandwidthStatus {
    /// Returns `true` if the entry holds a finite, positive bandwidth.
    pub fn is_usable(self) -> bool {
        self != Self::Unusable
    }
}

/// A selected bandwidth and how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BandwidthEstimate {
    pub(crate) value: Option<f64>,
    pub(crate) status: BandwidthStatus,
}

impl BandwidthEstimate {
    fn unusable() -> Self {
        Self {
            value: None,
            status: BandwidthStatus::Unusable,
        }
    }

    fn usable(value: f64, status: BandwidthStatus) -> Self {
        Self {
            value: Some(value),
            status,
        }
    }
}

/// Silverman's robust rule of thumb:
/// `h = 0.9 · min(sd, IQR / 1.34) · n^(-1/5)`.
///
/// Falls back to the standard deviation when the IQR is zero. Returns `None`
/// for fewer than two values or a (near-)constant sample.
pub(crate) fn rule_of_thumb(sample: &[f64]) -> Option<f64> {
    let n = sample.len();
    if n < 2 {
        return None;
    }
    let sd = smi_stats::sd(sample);
    let scale = smi_stats::mean(sample).abs().max(1.0);
    if !sd.is_finite() || sd <= SPREAD_EPS * scale {
        return None;
    }

    let sorted = smi_stats::sorted(sample);
    let iqr = smi_stats::iqr(&sorted);
    let spread = if iqr > SPREAD_EPS * scale {
        sd.min(iqr / 1.34)
    } else {
        sd
    };

    let h = 0.9 * spread * (n as f64).powf(-0.2);
    (h.is_finite() && h > 0.0).then_some(h)
}

/// Search interval `[max(0.2·h₀, range/n), 5·h₀]` around the rule-of-thumb
/// bandwidth `h0`.
fn search_range(sample: &[f64], h0: f64) -> (f64, f64) {
    let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let hi = 5.0 * h0;
    let lo = (0.2 * h0).max((max - min) / sample.len() as f64);
    if lo < hi { (lo, hi) } else { (0.2 * h0, hi) }
}

/// Minimises the cross-validation score over `[lo, hi]`.
///
/// Returns `None` if no candidate has a finite score.
fn cross_validate(sample: &[f64], lo: f64, hi: f64, config: &KdeConfig) -> Option<f64> {
    let n = config.n_candidates();
    let (log_lo, log_hi) = (lo.ln(), hi.ln());
    let step = (log_hi - log_lo) / (n - 1) as f64;
    let candidates: Vec<f64> = (0..n).map(|i| log_lo + step * i as f64).collect();
    let scores: Vec<f64> = candidates
        .iter()
        .map(|&lh| ucv_score(sample, lh.exp()))
        .collect();

    let (best_idx, best_score) = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    let a = candidates[best_idx.saturating_sub(1)];
    let b = candidates[(best_idx + 1).min(n - 1)];

    let cost = UcvCost { sample };
    let refined = Executor::new(cost, BrentOpt::new(a, b))
        .configure(|state| state.max_iters(config.max_iters()))
        .run()
        .ok()
        .and_then(|result| {
            let state = result.state();
            state
                .best_param
                .filter(|_| state.best_cost.is_finite() && state.best_cost <= best_score)
        });

    Some(refined.unwrap_or(candidates[best_idx]).exp())
}

/// Cost function for argmin: cross-validation score over `ln(h)`.
struct UcvCost<'a> {
    sample: &'a [f64],
}

impl CostFunction for UcvCost<'_> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, log_h: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let score = ucv_score(self.sample, log_h.exp());
        Ok(if score.is_finite() { score } else { f64::MAX })
    }
}

/// Selects the bandwidth for one sample of valid values.
pub(crate) fn select_bandwidth(sample: &[f64], config: &KdeConfig) -> BandwidthEstimate {
    if sample.len() < config.min_samples() {
        return BandwidthEstimate::unusable();
    }
    let Some(h0) = rule_of_thumb(sample) else {
        return BandwidthEstimate::unusable();
    };

    match config.method() {
        BandwidthMethod::RuleOfThumb => {
            BandwidthEstimate::usable(h0, BandwidthStatus::RuleOfThumb)
        }
        BandwidthMethod::CrossValidation => {
            if sample.len() < config.min_cv_samples() {
                return BandwidthEstimate::usable(h0, BandwidthStatus::Fallback);
            }
            let (lo, hi) = search_range(sample, h0);
            match cross_validate(sample, lo, hi, config) {
                Some(h) if h.is_finite() && h > 0.0 => {
                    BandwidthEstimate::usable(h, BandwidthStatus::CrossValidated)
                }
                _ => BandwidthEstimate::usable(h0, BandwidthStatus::Fallback),
            }
        }
    }
}
