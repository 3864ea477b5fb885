//! Gaussian kernel primitives and the unbiased cross-validation score.

use statrs::function::erf::erfc;

/// 1 / sqrt(2π).
const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// 1 / sqrt(4π), the peak of the N(0, 2) density.
const INV_SQRT_4PI: f64 = 0.282_094_791_773_878_14;

/// Standard normal density.
#[inline]
pub(crate) fn gauss_pdf(u: f64) -> f64 {
    INV_SQRT_2PI * (-0.5 * u * u).exp()
}

/// Standard normal cumulative distribution, via the complementary error
/// function so the lower tail keeps full relative precision.
#[inline]
pub(crate) fn gauss_cdf(u: f64) -> f64 {
    0.5 * erfc(-u / std::f64::consts::SQRT_2)
}

/// Density of N(0, 2), the self-convolution of the Gaussian kernel.
#[inline]
fn gauss2_pdf(u: f64) -> f64 {
    INV_SQRT_4PI * (-0.25 * u * u).exp()
}

/// Unbiased (least-squares) leave-one-out cross-validation score of a
/// Gaussian kernel density estimate with bandwidth `h`:
///
/// `UCV(h) = ∫ f̂² − (2/n) Σᵢ f̂₋ᵢ(xᵢ)`
///
/// Both terms have closed forms for the Gaussian kernel. Returns `+∞` for
/// fewer than two points or a non-positive bandwidth.
pub(crate) fn ucv_score(sample: &[f64], h: f64) -> f64 {
    let n = sample.len();
    if n < 2 || !h.is_finite() || h <= 0.0 {
        return f64::INFINITY;
    }

    let mut sum_conv = 0.0;
    let mut sum_loo = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let u = (sample[i] - sample[j]) / h;
            sum_conv += gauss2_pdf(u);
            sum_loo += gauss_pdf(u);
        }
    }

    let nf = n as f64;
    let integral = (nf * INV_SQRT_4PI + 2.0 * sum_conv) / (nf * nf * h);
    let loo = 4.0 * sum_loo / (nf * (nf - 1.0) * h);
    integral - loo
}
