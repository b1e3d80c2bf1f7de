//! Rolling z-scores of returns

use statrs::statistics::Statistics;

/// Standard deviations below this are treated as zero
const MIN_STD: f64 = 1e-10;

/// z-score of `value` against `window`, population standard deviation
fn standardize(value: f64, window: &[f64]) -> f64 {
    let mean = window.iter().mean();
    let std = window.iter().population_std_dev();
    if !std.is_finite() || std < MIN_STD {
        return f64::NAN;
    }
    (value - mean) / std
}

/// Rolling z-score over the trailing `window` values, current value included
///
/// The first `window - 1` entries are NaN, as is any entry whose window has
/// zero spread or contains NaN.
pub fn rolling_zscore(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }

    for (i, slice) in values.windows(window).enumerate() {
        out[i + window - 1] = standardize(slice[window - 1], slice);
    }
    out
}

/// z-score of the last value against the trailing `window` values
///
/// Uses every value when fewer than `window` exist. NaN for fewer than two.
pub fn latest_zscore(values: &[f64], window: usize) -> f64 {
    let start = values.len().saturating_sub(window.max(2));
    let tail = &values[start..];
    match tail.last() {
        Some(&last) if tail.len() >= 2 => standardize(last, tail),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rolling_prefix_is_nan() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let z = rolling_zscore(&values, 3);

        assert!(z[0].is_nan() && z[1].is_nan());
        // [1, 2, 3]: mean 2, population std sqrt(2/3)
        assert_abs_diff_eq!(z[2], 1.0 / (2.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(z[5], z[2], epsilon = 1e-12);
    }

    #[test]
    fn test_flat_window_is_nan() {
        let z = rolling_zscore(&[0.01; 10], 5);
        assert!(z.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_window_larger_than_input() {
        let z = rolling_zscore(&[1.0, 2.0], 5);
        assert_eq!(z.len(), 2);
        assert!(z.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_latest_zscore_uses_tail() {
        let mut values = vec![0.0; 19];
        values.push(1.0);
        // one outlier among n values scores sqrt(n - 1)
        assert_abs_diff_eq!(latest_zscore(&values, 20), 19f64.sqrt(), epsilon = 1e-12);

        let mut longer = vec![5.0; 50];
        longer.extend(values);
        assert_abs_diff_eq!(latest_zscore(&longer, 20), 19f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_latest_zscore_short_input() {
        assert!(latest_zscore(&[], 20).is_nan());
        assert!(latest_zscore(&[0.5], 20).is_nan());
        assert_abs_diff_eq!(latest_zscore(&[0.0, 1.0], 20), 1.0, epsilon = 1e-12);
    }
}
