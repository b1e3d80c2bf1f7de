//! Technical indicators used as exogenous feature columns
//!
//! Warm-up positions are NaN so that the feature frame can drop them.

/// Exponential moving average seeded with the SMA of the first `period` values
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![f64::NAN; data.len()];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = vec![f64::NAN; period - 1];

    let first_sma: f64 = data[..period].iter().sum::<f64>() / period as f64;
    result.push(first_sma);

    let mut prev = first_sma;
    for &value in &data[period..] {
        prev = (value - prev) * multiplier + prev;
        result.push(prev);
    }

    result
}

/// Relative Strength Index with Wilder smoothing
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    if period == 0 || n <= period {
        return vec![f64::NAN; n];
    }

    let mut result = vec![f64::NAN; period];

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result.push(rsi_value(avg_gain, avg_loss));

    let p = period as f64;
    for i in (period + 1)..n {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        result.push(rsi_value(avg_gain, avg_loss));
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// MACD line (fast EMA minus slow EMA)
pub fn macd(closes: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);

    fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(&f, &s)| if f.is_nan() || s.is_nan() { f64::NAN } else { f - s })
        .collect()
}
