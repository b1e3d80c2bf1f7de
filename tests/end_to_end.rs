//! End-to-end scenarios across forecasting, momentum and options signals

use std::sync::Arc;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use chrono::{Datelike, NaiveDate, Weekday};
use quant_signal_engine::model::{LstmConfig, RecurrentSequenceForecaster};
use quant_signal_engine::options::Indicator;
use quant_signal_engine::preprocessing::FeatureWindower;
use quant_signal_engine::prelude::*;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn wavy(n: usize) -> PriceSeries {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 + (i as f64 * 0.3).sin() * 2.0 + i as f64 * 0.05)
        .collect();
    PriceSeries::from_closes(start(), &closes)
}

#[test]
fn constant_price_arima_forecast_has_zero_error() {
    let series = PriceSeries::from_closes(start(), &[100.0; 30]);
    let frame = FeatureFrame::from_prices(&series);

    let forecast = ArimaForecaster::default()
        .forecast(&ForecastRequest::new(&frame, 5, ForecastMode::Future))
        .unwrap();

    assert_eq!(forecast.len(), 5);
    for value in forecast.values() {
        assert_abs_diff_eq!(value, 100.0, epsilon = 1e-6);
    }

    let actuals = PriceSeries::from_closes(forecast.dates()[0], &[100.0; 5]);
    let row = EnsembleEvaluator::new().evaluate_one(&forecast, &actuals).unwrap();
    assert_abs_diff_eq!(row.rmse, 0.0, epsilon = 1e-6);
}

#[test]
fn arima_dates_are_next_business_days() {
    let series = wavy(40);
    let frame = FeatureFrame::from_prices(&series);
    let forecast = ArimaForecaster::default()
        .forecast(&ForecastRequest::new(&frame, 7, ForecastMode::Future))
        .unwrap();

    let dates = forecast.dates();
    assert_eq!(dates.len(), 7);
    assert!(dates[0] > *series.dates().last().unwrap());
    assert!(dates.windows(2).all(|w| w[0] < w[1]));
    assert!(dates
        .iter()
        .all(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
}

#[test]
fn windower_counts_and_fits_on_training_slice() {
    let series = wavy(50);
    let frame = FeatureFrame::from_prices(&series);
    let dataset = FeatureWindower::new(10).fit_transform(&frame, 45).unwrap();

    assert_eq!(dataset.len(), 40);
    assert_eq!(dataset.lookback(), 10);

    let train_max = series.closes()[..45].iter().cloned().fold(f64::MIN, f64::max);
    assert_abs_diff_eq!(dataset.scaler().max_vals()[0], train_max, epsilon = 1e-12);
}

#[test]
fn recurrent_forecaster_returns_constant_for_constant_series() {
    let series = PriceSeries::from_closes(start(), &[100.0; 40]);
    let frame = FeatureFrame::from_prices(&series);
    let forecaster = RecurrentSequenceForecaster::new(LstmConfig::small().with_seed(42));

    let forecast = forecaster
        .forecast(&ForecastRequest::new(&frame, 5, ForecastMode::Future))
        .unwrap();

    for value in forecast.values() {
        assert_abs_diff_eq!(value, 100.0, epsilon = 1e-6);
    }
}

#[test]
fn perfect_forecasts_score_zero() {
    let actuals = wavy(5);
    let forecasts = vec![
        Forecast::new("A", actuals.dates(), actuals.closes()),
        Forecast::new("B", actuals.dates(), actuals.closes()),
    ];
    let table = EnsembleEvaluator::new().evaluate(&forecasts, &actuals).unwrap();

    for name in ["A", "B"] {
        let row = table.get(name).unwrap();
        assert_eq!(row.rmse, 0.0);
        assert_eq!(row.mape, 0.0);
    }
}

#[test]
fn backtest_pipeline_isolates_failures() {
    let mut config = EngineConfig::default();
    config.forecast.horizon = 5;
    config.lstm = LstmConfig::small().with_seed(7).with_lookback(30);

    // 30 training rows cannot fill a 30-step lookback plus a target
    let report = ForecastPipeline::from_config(&config).run(&FeatureFrame::from_prices(&wavy(35))).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].model, "LSTM");
    assert_eq!(report.forecasts.len(), 2);
    assert!(report.metrics.get("ARIMA").is_some());
    assert!(report.metrics.get("Additive").is_some());
}

#[test]
fn spike_detected_with_direction() {
    let mut closes = vec![100.0; 25];
    closes.extend([120.0; 5]);
    closes.extend([96.0; 25]);
    let prices = PriceSeries::from_closes(start(), &closes);

    let report = MomentumBurstDetector::new(20, 2.5).unwrap().detect(&prices);

    let directions: Vec<Direction> = report.events.iter().map(|e| e.direction).collect();
    assert_eq!(directions, vec![Direction::Bullish, Direction::Bearish]);
    assert_eq!(report.events[0].date, prices.dates()[25]);
    assert_eq!(report.events[1].date, prices.dates()[30]);
}

#[test]
fn constant_returns_yield_no_bursts() {
    let closes: Vec<f64> = (0..60).map(|i| 100.0 * 1.01f64.powi(i)).collect();
    let detector = MomentumBurstDetector::new(20, 2.5).unwrap();
    assert!(!detector.detect(&PriceSeries::from_closes(start(), &closes)).has_bursts());

    let flat = PriceSeries::from_closes(start(), &[42.0; 60]);
    assert!(!detector.detect(&flat).has_bursts());
}

fn scenario_chain() -> OptionChainSnapshot {
    let expiry = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    OptionChainSnapshot::new(vec![
        OptionContract::new(103.0, OptionType::Call, expiry).with_iv(0.20).with_volume(80.0),
        OptionContract::new(106.0, OptionType::Call, expiry).with_iv(0.25).with_volume(120.0),
        OptionContract::new(94.0, OptionType::Put, expiry).with_iv(0.50).with_volume(90.0),
        OptionContract::new(98.0, OptionType::Put, expiry).with_iv(0.55).with_volume(60.0),
    ])
}

#[test]
fn option_chain_scenario() {
    let set = OptionsIndicatorEngine::default().compute(&scenario_chain(), 100.0);

    assert_abs_diff_eq!(set.avg_iv, 0.375, epsilon = 1e-12);
    assert_abs_diff_eq!(set.vol_skew, 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(set.put_call_volume_ratio, 0.75, epsilon = 1e-12);
    assert!(set.get(Indicator::PutCallOiRatio).is_none());

    let signal = SignalSynthesizer::default().options_signal(&set);
    assert_eq!(
        signal.lines(),
        vec![
            "Sell premium (IV is high)",
            "Bullish flow (call volume dominates)",
            "Open interest signal unavailable",
            "Bearish skew (puts richer)",
        ]
    );
}

#[test]
fn calls_only_chain_reports_nan() {
    let calls: Vec<OptionContract> = scenario_chain().calls().cloned().collect();
    let set = OptionsIndicatorEngine::default().compute(&OptionChainSnapshot::new(calls), 100.0);

    assert!(set.put_call_volume_ratio.is_nan());
    assert!(set.vol_skew.is_nan());
}

#[tokio::test]
async fn runner_executes_configured_models() {
    let mut config = EngineConfig::default();
    config.forecast.horizon = 5;
    config.forecast.backtest = false;
    config.lstm = LstmConfig::small().with_seed(3);

    let runner = ForecastRunner::with_limits(Duration::from_secs(60), 2);
    let frame = FeatureFrame::from_prices(&wavy(60));
    let forecasters: Vec<Arc<dyn Forecaster>> =
        config.forecast.models.iter().map(|m| m.build(&config)).collect();

    let outcomes = runner.run_all(forecasters, &frame, 5, ForecastMode::Future).await;

    let names: Vec<&str> = outcomes.iter().map(|o| o.model.as_str()).collect();
    assert_eq!(names, vec!["ARIMA", "LSTM", "Additive"]);
    assert!(outcomes.iter().all(|o| o.result.as_ref().map(|f| f.len() == 5).unwrap_or(false)));
}
