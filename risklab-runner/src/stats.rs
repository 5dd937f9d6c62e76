//! Distribution statistics shared by the robustness validators.

use risklab_core::metrics::{mean_f64, std_dev};
use serde::{Deserialize, Serialize};

/// Summary of a sample: moments, extremes and the 5/25/50/75/95 percentiles.
///
/// `std` is the population standard deviation. Percentiles interpolate
/// linearly between order statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
}

impl DistributionStats {
    /// Non-finite values are dropped before computing. An empty sample is all zeros.
    pub fn from_values(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            count: sorted.len(),
            mean: mean_f64(&sorted),
            median: percentile_sorted(&sorted, 50.0),
            std: std_dev(&sorted),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p5: percentile_sorted(&sorted, 5.0),
            p25: percentile_sorted(&sorted, 25.0),
            p75: percentile_sorted(&sorted, 75.0),
            p95: percentile_sorted(&sorted, 95.0),
        }
    }
}

/// Linear-interpolation percentile of an ascending slice. `p` is in `[0, 100]`.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&v, 0.0), 1.0);
        assert_eq!(percentile_sorted(&v, 50.0), 3.0);
        assert_eq!(percentile_sorted(&v, 100.0), 5.0);
        assert!((percentile_sorted(&v, 5.0) - 1.2).abs() < 1e-12);
        assert!((percentile_sorted(&v, 95.0) - 4.8).abs() < 1e-12);
    }

    #[test]
    fn percentile_of_single_value() {
        assert_eq!(percentile_sorted(&[7.0], 25.0), 7.0);
        assert_eq!(percentile_sorted(&[], 25.0), 0.0);
    }

    #[test]
    fn stats_of_unsorted_sample() {
        let s = DistributionStats::from_values(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert!((s.std - 1.25_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let s = DistributionStats::from_values(&[1.0, f64::INFINITY, f64::NAN, 3.0]);
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, 2.0);
    }

    #[test]
    fn empty_sample_is_zero() {
        assert_eq!(DistributionStats::from_values(&[]), DistributionStats::default());
    }
}
