//! Criterion benchmarks for the robustness validators.
//!
//! Run with: `cargo bench -p risklab-runner`
//!
//! 1. Monte Carlo resampling, sequential vs rayon
//! 2. Walk-forward over a year of hourly candles

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{Duration, TimeZone, Utc};
use risklab_core::domain::Candle;
use risklab_runner::{
    run_backtest, run_monte_carlo, run_walk_forward, MonteCarloConfig, RunConfig,
    WalkForwardConfig,
};

fn make_candles(n: usize) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.05).sin() * 10.0 + i as f64 * 0.01;
            Candle::new(
                start + Duration::hours(i as i64),
                close - 0.2,
                close + 0.8,
                close - 0.8,
                close,
                1_000.0,
            )
        })
        .collect()
}

fn bench_monte_carlo(c: &mut Criterion) {
    let config = RunConfig::default();
    let result = run_backtest(&config, &make_candles(8_760), None).unwrap();
    let mut group = c.benchmark_group("monte_carlo");
    group.sample_size(10);

    for parallel in [false, true] {
        let mc = MonteCarloConfig {
            iterations: 1_000,
            seed: Some(42),
            parallel,
            ..MonteCarloConfig::default()
        };
        let label = if parallel { "rayon" } else { "sequential" };
        group.bench_with_input(BenchmarkId::from_parameter(label), &mc, |b, mc| {
            b.iter(|| {
                run_monte_carlo(
                    black_box(&result.trades),
                    config.simulation.initial_capital,
                    config.simulation.periods_per_year,
                    mc,
                )
                .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_walk_forward(c: &mut Criterion) {
    let candles = make_candles(8_760);
    let config = RunConfig {
        walk_forward: WalkForwardConfig {
            train_days: 60,
            test_days: 20,
            step_days: 20,
            ..WalkForwardConfig::default()
        },
        ..RunConfig::default()
    };
    let mut group = c.benchmark_group("walk_forward");
    group.sample_size(10);
    group.bench_function("rolling_1y_hourly", |b| {
        b.iter(|| run_walk_forward(black_box(&config), black_box(&candles)).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_monte_carlo, bench_walk_forward);
criterion_main!(benches);
