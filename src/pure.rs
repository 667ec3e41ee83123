// Pure Functions
// Deterministic numeric helpers shared by aggregation, normalization and the
// comparison table. No I/O, no logging.

/// Sample statistics for one metric within one group
pub mod statistics {
    use serde::{Deserialize, Serialize};

    /// Mean, sample standard deviation, count and standard error
    ///
    /// Missing observations are ignored. With fewer than two observations the
    /// standard deviation and standard error are undefined.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
    pub struct SampleStats {
        pub mean: Option<f64>,
        pub std: Option<f64>,
        pub count: usize,
        pub sem: Option<f64>,
    }

    /// Compute Bessel-corrected statistics over the present, finite values
    pub fn sample_stats<I>(values: I) -> SampleStats
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let observed: Vec<f64> = values
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite())
            .collect();
        let count = observed.len();
        if count == 0 {
            return SampleStats::default();
        }

        let n = count as f64;
        let mean = observed.iter().sum::<f64>() / n;

        let (std, sem) = if count < 2 {
            (None, None)
        } else {
            let variance = observed
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (n - 1.0);
            let std = variance.sqrt();
            (Some(std), Some(std / n.sqrt()))
        };

        SampleStats {
            mean: Some(mean),
            std,
            count,
            sem,
        }
    }

    /// Mean of the present values, `None` when there are none
    pub fn mean_of<I>(values: I) -> Option<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        let (sum, count) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Median of the finite values, averaging the middle pair for even counts
    pub fn median(values: &[f64]) -> Option<f64> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Average of `(value, weight)` pairs weighted by sample count
    ///
    /// Pairs with a missing value or zero weight do not contribute.
    pub fn weighted_mean<I>(pairs: I) -> Option<f64>
    where
        I: IntoIterator<Item = (Option<f64>, usize)>,
    {
        let (weighted_sum, total_weight) = pairs
            .into_iter()
            .filter_map(|(value, weight)| {
                value
                    .filter(|v| v.is_finite() && weight > 0)
                    .map(|v| (v, weight))
            })
            .fold((0.0, 0usize), |(sum, total), (v, w)| (sum + v * w as f64, total + w));
        if total_weight == 0 {
            None
        } else {
            Some(weighted_sum / total_weight as f64)
        }
    }
}

/// Ratios and percentages that must never produce infinities
pub mod ratios {
    /// `numerator / denominator`, `None` when either side is missing or the
    /// result is not finite
    pub fn safe_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
        let value = numerator? / denominator?;
        value.is_finite().then_some(value)
    }

    /// Coefficient of variation in percent; undefined for a zero mean
    pub fn coefficient_of_variation(std: Option<f64>, mean: Option<f64>) -> Option<f64> {
        safe_ratio(std, mean).map(|r| r * 100.0)
    }

    /// `value` as a percentage of a strictly positive baseline
    ///
    /// A missing or non-positive value, or a missing or non-positive
    /// baseline, yields `None` rather than zero.
    pub fn percent_of(value: Option<f64>, baseline: Option<f64>) -> Option<f64> {
        let value = value.filter(|v| v.is_finite() && *v > 0.0)?;
        let baseline = baseline.filter(|b| b.is_finite() && *b > 0.0)?;
        Some(value / baseline * 100.0)
    }
}
