//! Statistical helper functions for the soil moisture index pipeline.
//!
//! Sample moments and R-compatible (type 7) quantiles used by the kernel
//! bandwidth rule and the severity-area-duration percentile curves.

/// Arithmetic mean of a slice. Returns 0.0 if empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample variance with N-1 denominator (matching R's `var()`).
/// Returns 0.0 if fewer than 2 elements.
pub fn variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let ss: f64 = data.iter().map(|&x| (x - m).powi(2)).sum();
    ss / (data.len() - 1) as f64
}

/// Sample standard deviation with N-1 denominator (matching R's `sd()`).
pub fn sd(data: &[f64]) -> f64 {
    variance(data).sqrt()
}

/// R's default quantile algorithm (type=7) on pre-sorted data.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn quantile_type7(sorted: &[f64], p: f64) -> f64 {
    assert!(
        !sorted.is_empty(),
        "quantile_type7: input must not be empty"
    );
    let last = sorted.len() - 1;
    let h = last as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(last);
    sorted[lo] + h.fract() * (sorted[hi] - sorted[lo])
}

/// Interquartile range (Q75 - Q25) of pre-sorted data, using type-7
/// quantiles.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn iqr(sorted: &[f64]) -> f64 {
    quantile_type7(sorted, 0.75) - quantile_type7(sorted, 0.25)
}

/// Sorts a copy of `data` ascending using the IEEE total order.
pub fn sorted(data: &[f64]) -> Vec<f64> {
    let mut v = data.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Type-7 quantiles of unsorted data at each probability in `probs`.
///
/// Returns `None` if `data` is empty.
pub fn percentiles(data: &[f64], probs: &[f64]) -> Option<Vec<f64>> {
    if data.is_empty() {
        return None;
    }
    let s = sorted(data);
    Some(probs.iter().map(|&p| quantile_type7(&s, p)).collect())
}
