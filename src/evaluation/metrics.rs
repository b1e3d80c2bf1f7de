//! Forecast error metrics

/// Mean Squared Error
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n as f64
}

/// Root Mean Squared Error
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Mean Absolute Error
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n as f64
}

/// Mean Absolute Percentage Error, in percent
///
/// Points with a zero actual are skipped; NaN when none remain.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    let (sum, count) = actual
        .iter()
        .zip(predicted.iter())
        .filter(|(a, _)| **a != 0.0)
        .fold((0.0, 0usize), |(sum, count), (a, p)| {
            (sum + ((a - p) / a).abs(), count + 1)
        });

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse() {
        let error = mse(&[1.0, 2.0, 3.0], &[1.1, 2.0, 2.9]);
        assert!((error - 0.006666666666666667).abs() < 1e-10);
    }

    #[test]
    fn test_perfect_forecast() {
        let actual = [100.0, 101.0, 102.0];
        assert_eq!(rmse(&actual, &actual), 0.0);
        assert_eq!(mape(&actual, &actual), 0.0);
        assert_eq!(mae(&actual, &actual), 0.0);
    }

    #[test]
    fn test_mape_skips_zero_actuals() {
        let value = mape(&[0.0, 100.0], &[5.0, 110.0]);
        assert!((value - 10.0).abs() < 1e-10);
        assert!(mape(&[0.0], &[1.0]).is_nan());
    }

    #[test]
    fn test_empty_input_is_nan() {
        assert!(rmse(&[], &[]).is_nan());
        assert!(mae(&[], &[]).is_nan());
    }
}
