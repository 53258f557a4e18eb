//! Statistical estimators for tree-node distributions.
//!
//! This module provides the calibrated-uncertainty math consumed by the
//! tree predictors:
//!
//! - Wilson score lower bound for a label's share of a distribution
//! - Regression error (chi-squared based) for merged numeric bins
//! - Gini impurity of a categorical distribution
//! - Median of a binned distribution
//! - Nearest-neighbor bin merging down to a bin-count limit
//!
//! The special functions these need (error function, log-gamma,
//! regularized incomplete gamma, chi-squared quantile) are approximated
//! locally with series expansions and continued fractions; no external
//! stats crate is involved.
//!
//! # Examples
//!
//! ```
//! use predecir::stats::ws_confidence;
//!
//! let distribution = vec![("yes".to_string(), 8.0), ("no".to_string(), 2.0)];
//! let confidence = ws_confidence("yes", &distribution, 1.96).unwrap();
//! assert!(confidence > 0.0 && confidence < 0.8);
//! ```

use crate::error::{PredecirError, Result};

/// Maximum number of bins kept in a merged regression distribution.
pub const BINS_LIMIT: usize = 32;

/// Default z-value for confidence estimates (95% two-sided).
pub const DEFAULT_Z: f64 = 1.96;

/// Wilson score lower bound for the share of `label` in `distribution`.
///
/// Weights are re-normalized to sum to 1 before use. The total weight of
/// the distribution is used as the sample size.
///
/// # Errors
///
/// Returns `InvalidDistribution` when the total weight is zero or
/// negative.
pub fn ws_confidence(label: &str, distribution: &[(String, f64)], z: f64) -> Result<f64> {
    let total: f64 = distribution.iter().map(|(_, weight)| weight).sum();
    if total <= 0.0 {
        return Err(PredecirError::InvalidDistribution {
            message: format!("total weight {total} is not positive"),
        });
    }
    let weight = distribution
        .iter()
        .find(|(candidate, _)| candidate == label)
        .map_or(0.0, |(_, weight)| *weight);
    if weight < 0.0 {
        return Err(PredecirError::InvalidDistribution {
            message: format!("negative weight {weight} for label {label}"),
        });
    }

    let p = weight / total;
    let n = total;
    let z2 = z * z;
    let factor = z2 / n;
    let inner = (p * (1.0 - p) + factor / 4.0) / n;
    Ok((p + factor / 2.0 - z * inner.sqrt()) / (1.0 + factor))
}

/// Confidence of a regression prediction over a merged distribution.
///
/// Given the unbiased sample variance of the distribution around its
/// mean and the population count, scales the variance by the chi-squared
/// quantile with `population` degrees of freedom evaluated at
/// `1 - erf(z / sqrt(2))`.
///
/// Returns `f64::NAN` when the computation is statistically meaningless
/// (non-positive population, or a degenerate quantile); callers must
/// check before using the result.
#[must_use]
pub fn regression_error(variance: f64, population: f64, z: f64) -> f64 {
    if population > 0.0 {
        let p = 1.0 - erf(z / 2.0_f64.sqrt());
        let ppf = chi_squared_quantile(p, population);
        if ppf != 0.0 {
            let error =
                variance * (population - 1.0) / ppf * (population.sqrt() + z).powi(2);
            return (error / population).sqrt();
        }
    }
    f64::NAN
}

/// Gini impurity of a categorical distribution: `(1 - sum(p_i^2)) / 2`,
/// which ranges over `[0, 0.5]`. An empty or zero-weight distribution
/// has impurity 0.
#[must_use]
pub fn gini_impurity(distribution: &[(String, f64)]) -> f64 {
    let total: f64 = distribution.iter().map(|(_, weight)| weight).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let purity: f64 = distribution
        .iter()
        .map(|(_, weight)| {
            let p = weight / total;
            p * p
        })
        .sum();
    (1.0 - purity) / 2.0
}

/// Weighted mean of a binned distribution.
#[must_use]
pub fn dist_mean(bins: &[(f64, f64)]) -> f64 {
    let mut addition = 0.0;
    let mut count = 0.0;
    for (point, instances) in bins {
        addition += point * instances;
        count += instances;
    }
    if count > 0.0 {
        addition / count
    } else {
        f64::NAN
    }
}

/// Unbiased sample variance of a binned distribution around `mean` (or
/// around its own mean when `mean` is `None`).
///
/// Returns `f64::NAN` when the distribution holds one instance or fewer.
#[must_use]
pub fn unbiased_sample_variance(bins: &[(f64, f64)], mean: Option<f64>) -> f64 {
    let mean = mean.unwrap_or_else(|| dist_mean(bins));
    let mut addition = 0.0;
    let mut count = 0.0;
    for (point, instances) in bins {
        addition += (point - mean).powi(2) * instances;
        count += instances;
    }
    if count > 1.0 {
        addition / (count - 1.0)
    } else {
        f64::NAN
    }
}

/// Median of a binned distribution with `count` total instances.
///
/// Walks the bins in ascending point order accumulating counts and
/// returns the bin value where the cumulative count first exceeds half
/// the total. With an even total, when the cumulative count immediately
/// before that bin lands exactly on half, the midpoint of that bin's
/// value and the previous bin's value is returned instead.
#[must_use]
pub fn dist_median(bins: &[(f64, f64)], count: f64) -> Option<f64> {
    let half = count / 2.0;
    let even = (count / 2.0).fract() == 0.0;
    let mut cumulative = 0.0;
    let mut previous: Option<f64> = None;
    for (point, instances) in bins {
        cumulative += instances;
        if cumulative > half {
            if even && cumulative - instances == half {
                if let Some(previous) = previous {
                    return Some((point + previous) / 2.0);
                }
            }
            return Some(*point);
        }
        previous = Some(*point);
    }
    None
}

/// Reduces a binned distribution to at most `limit` bins by repeatedly
/// merging the pair of adjacent bins whose points are closest, summing
/// their weights and re-centering the merged bin on the weighted mean of
/// the pair. Bins must be sorted ascending by point.
#[must_use]
pub fn merge_bins(mut bins: Vec<(f64, f64)>, limit: usize) -> Vec<(f64, f64)> {
    if limit < 1 {
        return bins;
    }
    while bins.len() > limit && bins.len() >= 2 {
        let mut index_to_merge = 1;
        let mut shortest = f64::INFINITY;
        for index in 1..bins.len() {
            let distance = bins[index].0 - bins[index - 1].0;
            if distance < shortest {
                shortest = distance;
                index_to_merge = index;
            }
        }
        let (left_point, left_weight) = bins[index_to_merge - 1];
        let (right_point, right_weight) = bins[index_to_merge];
        let weight = left_weight + right_weight;
        let point = (left_point * left_weight + right_point * right_weight) / weight;
        bins[index_to_merge - 1] = (point, weight);
        bins.remove(index_to_merge);
    }
    bins
}

// ============================================================================
// Special function approximations
// ============================================================================

/// Error function approximation (Abramowitz & Stegun 7.1.26).
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736
                + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Log-gamma approximation (Lanczos).
fn ln_gamma(z: f64) -> f64 {
    const COEFFICIENTS: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_7e-2,
        -0.539_523_938_495_3e-5,
    ];
    let x = z;
    let mut tmp = x + 5.5;
    tmp -= (x + 0.5) * tmp.ln();
    let mut series = 1.000_000_000_190_015;
    for (i, coefficient) in COEFFICIENTS.iter().enumerate() {
        series += coefficient / (x + 1.0 + i as f64);
    }
    -tmp + (2.506_628_274_631_000_5 * series / x).ln()
}

/// Regularized lower incomplete gamma P(a, x), via the series expansion
/// for small x and the continued fraction (Lentz's algorithm) otherwise.
fn lower_incomplete_gamma(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if a <= 0.0 {
        return 1.0;
    }
    if x < a + 1.0 {
        // Series expansion
        let mut term = 1.0 / a;
        let mut sum = term;
        for n in 1..200 {
            term *= x / (a + n as f64);
            sum += term;
            if term.abs() < sum.abs() * 1e-12 {
                break;
            }
        }
        (sum.ln() + a * x.ln() - x - ln_gamma(a)).exp().clamp(0.0, 1.0)
    } else {
        // Continued fraction for the upper tail
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / 1e-300;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..200 {
            let an = -(i as f64) * (i as f64 - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < 1e-300 {
                d = 1e-300;
            }
            c = b + an / c;
            if c.abs() < 1e-300 {
                c = 1e-300;
            }
            d = 1.0 / d;
            let del = d * c;
            h *= del;
            if (del - 1.0).abs() < 1e-12 {
                break;
            }
        }
        let upper = (a * x.ln() - x - ln_gamma(a)).exp() * h;
        (1.0 - upper).clamp(0.0, 1.0)
    }
}

/// Chi-squared CDF with `dof` degrees of freedom.
fn chi_squared_cdf(x: f64, dof: f64) -> f64 {
    lower_incomplete_gamma(dof / 2.0, x / 2.0)
}

/// Chi-squared quantile (inverse CDF) by bracketed bisection.
fn chi_squared_quantile(p: f64, dof: f64) -> f64 {
    if p <= 0.0 {
        return 0.0;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    // Expand the bracket until the CDF passes p
    let mut hi = dof.max(1.0);
    let mut expansions = 0;
    while chi_squared_cdf(hi, dof) < p && expansions < 200 {
        hi *= 2.0;
        expansions += 1;
    }
    let mut lo = 0.0;
    for _ in 0..200 {
        let mid = (lo + hi) / 2.0;
        if chi_squared_cdf(mid, dof) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-10 * hi.max(1.0) {
            break;
        }
    }
    (lo + hi) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categorical(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs
            .iter()
            .map(|(label, weight)| (label.to_string(), *weight))
            .collect()
    }

    #[test]
    fn test_ws_confidence_bounds() {
        // Wilson lower bound for 8 of 10 at z = 1.96 is ~0.4902
        let distribution = categorical(&[("yes", 8.0), ("no", 2.0)]);
        let confidence = ws_confidence("yes", &distribution, DEFAULT_Z).expect("valid");
        assert!((confidence - 0.4902).abs() < 1e-3, "got {confidence}");
        assert!(confidence > 0.0 && confidence < 0.8);
        // the minority label's bound is below one half
        let low = ws_confidence("no", &distribution, DEFAULT_Z).expect("valid");
        assert!(low < 0.5);
        // an absent label has zero share and a zero lower bound
        let absent = ws_confidence("maybe", &distribution, DEFAULT_Z).expect("valid");
        assert!((0.0..0.05).contains(&absent));
    }

    #[test]
    fn test_ws_confidence_rejects_empty() {
        let err = ws_confidence("yes", &[], DEFAULT_Z).expect_err("empty distribution");
        assert!(matches!(err, PredecirError::InvalidDistribution { .. }));
    }

    #[test]
    fn test_ws_confidence_normalizes() {
        // identical proportions at different scales give different
        // sample sizes, so the larger sample has the tighter bound
        let small = categorical(&[("yes", 4.0), ("no", 1.0)]);
        let large = categorical(&[("yes", 400.0), ("no", 100.0)]);
        let loose = ws_confidence("yes", &small, DEFAULT_Z).expect("valid");
        let tight = ws_confidence("yes", &large, DEFAULT_Z).expect("valid");
        assert!(tight > loose);
        assert!(tight < 0.8 && tight > 0.75);
    }

    #[test]
    fn test_gini_impurity_bounds() {
        let pure = categorical(&[("a", 10.0)]);
        assert_eq!(gini_impurity(&pure), 0.0);

        let balanced = categorical(&[("a", 5.0), ("b", 5.0)]);
        assert!((gini_impurity(&balanced) - 0.25).abs() < 1e-12);

        let skewed = categorical(&[("a", 9.0), ("b", 1.0)]);
        let impurity = gini_impurity(&skewed);
        assert!(impurity > 0.0 && impurity <= 0.5);
    }

    #[test]
    fn test_dist_median_odd_walk() {
        // cumulative 3 <= 5, 8 > 5 -> median is the second bin's value
        let bins = vec![(1.0, 3.0), (2.0, 5.0), (3.0, 2.0)];
        assert_eq!(dist_median(&bins, 10.0), Some(2.0));
    }

    #[test]
    fn test_dist_median_even_tie() {
        // total 4, cumulative hits exactly 2 before the second bin
        let bins = vec![(1.0, 2.0), (3.0, 2.0)];
        assert_eq!(dist_median(&bins, 4.0), Some(2.0));
    }

    #[test]
    fn test_dist_median_in_range() {
        let bins = vec![(0.5, 1.0), (1.5, 6.0), (9.0, 1.0)];
        let median = dist_median(&bins, 8.0).expect("median");
        assert!((0.5..=9.0).contains(&median));
    }

    #[test]
    fn test_merge_bins_cap_and_conservation() {
        let bins: Vec<(f64, f64)> = (0..50).map(|i| (i as f64, 2.0)).collect();
        let total: f64 = bins.iter().map(|(_, w)| w).sum();
        let merged = merge_bins(bins, BINS_LIMIT);
        assert!(merged.len() <= BINS_LIMIT);
        let merged_total: f64 = merged.iter().map(|(_, w)| w).sum();
        assert!((merged_total - total).abs() < 1e-9);
        // still sorted ascending
        for pair in merged.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
        }
    }

    #[test]
    fn test_merge_bins_merges_closest_pair() {
        let bins = vec![(0.0, 1.0), (0.1, 1.0), (10.0, 1.0)];
        let merged = merge_bins(bins, 2);
        assert_eq!(merged.len(), 2);
        assert!((merged[0].0 - 0.05).abs() < 1e-12);
        assert_eq!(merged[0].1, 2.0);
        assert_eq!(merged[1], (10.0, 1.0));
    }

    #[test]
    fn test_variance_and_mean() {
        let bins = vec![(1.0, 2.0), (3.0, 2.0)];
        assert!((dist_mean(&bins) - 2.0).abs() < 1e-12);
        // samples 1,1,3,3 around mean 2: sum sq = 4, n-1 = 3
        let variance = unbiased_sample_variance(&bins, None);
        assert!((variance - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_variance_degenerate() {
        assert!(unbiased_sample_variance(&[(1.0, 1.0)], None).is_nan());
    }

    #[test]
    fn test_regression_error_sentinel() {
        assert!(regression_error(1.0, 0.0, DEFAULT_Z).is_nan());
        assert!(regression_error(1.0, -3.0, DEFAULT_Z).is_nan());
    }

    #[test]
    fn test_regression_error_positive() {
        let error = regression_error(2.0, 20.0, DEFAULT_Z);
        assert!(error.is_finite());
        assert!(error > 0.0);
        // more instances shrink the error for the same variance
        let tighter = regression_error(2.0, 200.0, DEFAULT_Z);
        assert!(tighter < error);
    }

    #[test]
    fn test_erf_reference_points() {
        assert!(erf(0.0).abs() < 1e-7);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-4);
        assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-4);
        assert!((erf(2.0) - 0.995_322_27).abs() < 1e-4);
    }

    #[test]
    fn test_chi_squared_quantile_reference_points() {
        // chi2.ppf(0.05, 10) ~= 3.9403, chi2.ppf(0.95, 10) ~= 18.307
        let low = chi_squared_quantile(0.05, 10.0);
        assert!((low - 3.9403).abs() < 1e-2, "got {low}");
        let high = chi_squared_quantile(0.95, 10.0);
        assert!((high - 18.307).abs() < 1e-2, "got {high}");
        // the quantile inverts the CDF
        let p = chi_squared_cdf(low, 10.0);
        assert!((p - 0.05).abs() < 1e-6);
    }
}
