//! Kernel-smoothed cumulative distribution of one sample.

use crate::kernel::gauss_cdf;

/// Half-width of the inversion bracket beyond the sample extremes, in
/// bandwidths.
const BRACKET_MARGIN: f64 = 8.0;

/// Relative tolerance of the inversion.
const INVERSE_TOL: f64 = 1e-13;

/// Iteration cap of the bisection.
const MAX_BISECTIONS: usize = 200;

/// Result of inverting a [`KernelCdf`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inversion {
    /// Value whose cumulative probability matches the request.
    pub value: f64,
    /// `true` if the request lay outside the probability range reachable in
    /// the bracket and the value was clamped to the bracket end.
    pub clamped: bool,
}

/// Gaussian kernel estimate of a cumulative distribution:
/// `F(v) = (1/n) Σ Φ((v − xᵢ) / h)`.
#[derive(Debug, Clone)]
pub struct KernelCdf {
    sample: Vec<f64>,
    bandwidth: f64,
}

impl KernelCdf {
    /// Builds the estimate from the finite values of `sample`.
    ///
    /// Returns `None` if no finite value remains or the bandwidth is not
    /// finite and positive.
    pub fn new(sample: &[f64], bandwidth: f64) -> Option<Self> {
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return None;
        }
        let finite: Vec<f64> = sample.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        Some(Self {
            sample: smi_stats::sorted(&finite),
            bandwidth,
        })
    }

    /// Kernel bandwidth.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Number of sample values.
    pub fn len(&self) -> usize {
        self.sample.len()
    }

    /// Returns `true` if the sample is empty, which construction never
    /// allows.
    pub fn is_empty(&self) -> bool {
        self.sample.is_empty()
    }

    /// Search interval `[min − 8h, max + 8h]` used by [`KernelCdf::inverse`].
    pub fn bracket(&self) -> (f64, f64) {
        let margin = BRACKET_MARGIN * self.bandwidth;
        (
            self.sample[0] - margin,
            self.sample[self.sample.len() - 1] + margin,
        )
    }

    /// Cumulative probability of `value`. Returns `None` for non-finite
    /// input.
    pub fn forward(&self, value: f64) -> Option<f64> {
        value.is_finite().then(|| self.eval(value))
    }

    fn eval(&self, value: f64) -> f64 {
        let h = self.bandwidth;
        let sum: f64 = self.sample.iter().map(|&x| gauss_cdf((value - x) / h)).sum();
        (sum / self.sample.len() as f64).clamp(0.0, 1.0)
    }

    /// Value whose cumulative probability is `q`, by bisection over
    /// [`KernelCdf::bracket`].
    ///
    /// Requests at or beyond `F(lo)` or `F(hi)` return the bracket end with
    /// `clamped` set. Returns `None` for non-finite `q`.
    pub fn inverse(&self, q: f64) -> Option<Inversion> {
        if !q.is_finite() {
            return None;
        }
        let (mut lo, mut hi) = self.bracket();
        if q <= self.eval(lo) {
            return Some(Inversion {
                value: lo,
                clamped: true,
            });
        }
        if q >= self.eval(hi) {
            return Some(Inversion {
                value: hi,
                clamped: true,
            });
        }

        let scale = lo.abs().max(hi.abs()).max(self.bandwidth);
        for _ in 0..MAX_BISECTIONS {
            let mid = 0.5 * (lo + hi);
            if self.eval(mid) < q {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo <= INVERSE_TOL * scale {
                break;
            }
        }
        Some(Inversion {
            value: 0.5 * (lo + hi),
            clamped: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cdf() -> KernelCdf {
        KernelCdf::new(&[0.42, 0.1, 0.35, 0.2, 0.28, 0.5, 0.31], 0.05).unwrap()
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert!(KernelCdf::new(&[], 0.1).is_none());
        assert!(KernelCdf::new(&[f64::NAN], 0.1).is_none());
        assert!(KernelCdf::new(&[0.1, 0.2], 0.0).is_none());
        assert!(KernelCdf::new(&[0.1, 0.2], f64::INFINITY).is_none());
    }

    #[test]
    fn sample_keeps_only_finite_values() {
        let c = KernelCdf::new(&[0.2, f64::NAN, 0.1, f64::INFINITY], 0.1).unwrap();
        assert_eq!(c.len(), 2);
        assert!(!c.is_empty());
    }

    #[test]
    fn single_point_is_normal_cdf() {
        let c = KernelCdf::new(&[1.0], 0.5).unwrap();
        assert_relative_eq!(c.forward(1.0).unwrap(), 0.5, epsilon = 1e-15);
        assert_relative_eq!(c.forward(1.5).unwrap(), gauss_cdf(1.0), epsilon = 1e-15);
    }

    #[test]
    fn forward_is_monotone_and_bounded() {
        let c = cdf();
        let mut prev = 0.0;
        for i in 0..=200 {
            let v = -0.2 + i as f64 * 0.005;
            let q = c.forward(v).unwrap();
            assert!((0.0..=1.0).contains(&q));
            assert!(q >= prev, "F({v}) = {q} < {prev}");
            prev = q;
        }
    }

    #[test]
    fn forward_nodata_is_none() {
        assert!(cdf().forward(f64::NAN).is_none());
        assert!(cdf().inverse(f64::NAN).is_none());
    }

    #[test]
    fn round_trip_quantile() {
        let c = cdf();
        for &q in &[1e-6, 0.01, 0.2, 0.5, 0.77, 0.99, 1.0 - 1e-6] {
            let inv = c.inverse(q).unwrap();
            assert!(!inv.clamped);
            assert_relative_eq!(c.forward(inv.value).unwrap(), q, epsilon = 1e-9);
        }
    }

    #[test]
    fn round_trip_value() {
        let c = cdf();
        for &v in &[0.05, 0.2, 0.33, 0.49, 0.6] {
            let q = c.forward(v).unwrap();
            assert_relative_eq!(c.inverse(q).unwrap().value, v, epsilon = 1e-8);
        }
    }

    #[test]
    fn extreme_quantiles_are_clamped() {
        let c = cdf();
        let (lo, hi) = c.bracket();

        let low = c.inverse(0.0).unwrap();
        assert!(low.clamped);
        assert_eq!(low.value, lo);

        let high = c.inverse(1.0).unwrap();
        assert!(high.clamped);
        assert_eq!(high.value, hi);
    }

    #[test]
    fn bracket_spans_sample() {
        let (lo, hi) = cdf().bracket();
        assert_relative_eq!(lo, 0.1 - 0.4, epsilon = 1e-12);
        assert_relative_eq!(hi, 0.5 + 0.4, epsilon = 1e-12);
    }
}
