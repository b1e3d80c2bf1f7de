//! Signal report over synthetic data
//!
//! Run with: cargo run --example signal_report [config.toml]

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use quant_signal_engine::prelude::*;

/// Random walk with drift and a weekly pattern
fn synthetic_prices(days: usize, seed: u64) -> PriceSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 100.0;
    let closes: Vec<f64> = (0..days)
        .map(|i| {
            let weekly = [0.002, -0.001, 0.0, 0.001, -0.002][i % 5];
            price *= 1.0 + 0.0004 + weekly + rng.gen_range(-0.012..0.012);
            if i == days - 6 {
                price *= 1.06;
            }
            price
        })
        .collect();

    PriceSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default(), &closes)
}

fn synthetic_chain(spot: f64) -> OptionChainSnapshot {
    let expiry = NaiveDate::from_ymd_opt(2024, 12, 20).unwrap_or_default();
    let atm = spot.round();
    let mut contracts = Vec::new();

    for step in -6i32..=6 {
        let strike = atm + step as f64 * 2.5;
        let moneyness = (strike - spot) / spot;
        contracts.push(
            OptionContract::new(strike, OptionType::Call, expiry)
                .with_iv(0.24 - 0.3 * moneyness)
                .with_volume(1200.0 - 60.0 * step.abs() as f64)
                .with_open_interest(5000.0 + 150.0 * step as f64)
                .with_last_price((spot - strike).max(0.0) + 2.0),
        );
        contracts.push(
            OptionContract::new(strike, OptionType::Put, expiry)
                .with_iv(0.28 - 0.4 * moneyness)
                .with_volume(900.0 - 40.0 * step.abs() as f64)
                .with_open_interest(4500.0 - 120.0 * step as f64)
                .with_last_price((strike - spot).max(0.0) + 1.8),
        );
    }

    OptionChainSnapshot::new(contracts)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => {
            let mut config = EngineConfig::default();
            config.forecast.horizon = 10;
            config.lstm.seed = Some(42);
            config.lstm.epochs = 10;
            config
        }
    };
    setup_logging(&config.logging.level)?;

    let prices = synthetic_prices(260, 7);
    let frame = FeatureFrame::from_prices(&prices);

    println!("=== Forecasts ({:?}, H = {}) ===", config.forecast.mode(), config.forecast.horizon);
    let runner = ForecastRunner::new(&config.runtime);
    let report = ForecastPipeline::from_config(&config)
        .run_concurrent(&runner, &frame)
        .await?;

    for forecast in &report.forecasts {
        let values = forecast.values();
        println!(
            "{:<10} first {:>8.2}  last {:>8.2}",
            forecast.model,
            values.first().copied().unwrap_or(f64::NAN),
            values.last().copied().unwrap_or(f64::NAN)
        );
    }
    for failure in &report.failures {
        println!("{:<10} failed: {}", failure.model, failure.reason);
    }
    if !report.metrics.is_empty() {
        println!("\n{}", report.metrics);
        if let Some(best) = report.metrics.best_by_rmse() {
            println!("Best by RMSE: {}", best.model);
        }
    }

    if let Some(model) = config.forecast.models.first() {
        let forecaster: Arc<dyn Forecaster> = model.build(&config);
        let future = forecaster.forecast(&ForecastRequest::new(&frame, 5, ForecastMode::Future))?;
        println!("\nNext 5 business days ({}):", forecaster.name());
        for point in &future.points {
            println!("  {}  {:.2}", point.date, point.value);
        }
    }

    println!("\n=== Momentum bursts ===");
    let detector = MomentumBurstDetector::new(config.momentum.signal_window, config.momentum.threshold)?;
    let bursts = detector.detect(&prices);
    for event in &bursts.events {
        println!("{}  z = {:>6.2}  {}", event.date, event.zscore, event.direction);
    }
    match bursts.commentary() {
        Some(note) => println!("{}", note),
        None => println!("No bursts above {:.1}", detector.threshold()),
    }

    println!("\n=== Options signal ===");
    let spot = prices.last_close().unwrap_or(f64::NAN);
    let chain = synthetic_chain(spot);
    let engine = OptionsIndicatorEngine::from_config(&config.options)?;
    let synthesizer = SignalSynthesizer::new(config.signals);
    let combined = CombinedSignal::generate(
        &prices,
        &chain,
        &engine,
        &synthesizer,
        config.momentum.signal_window,
    )?;

    print!("{}", combined.indicators);
    println!("\nAction: {} (z = {:.2})", combined.action, combined.zscore);
    print!("{}", combined.signal);
    for line in &combined.explanations {
        println!("  {}", line);
    }
    if let Some(atm) = combined.atm {
        println!(
            "ATM {}: call IV {:?}, put IV {:?}, skew {:.3}",
            atm.atm_strike, atm.call_iv, atm.put_iv, atm.atm_skew
        );
    }

    Ok(())
}
