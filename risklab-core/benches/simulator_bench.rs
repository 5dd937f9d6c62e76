//! Criterion benchmarks for RiskLab hot paths.
//!
//! Benchmarks:
//! 1. Simulator bar loop (MA crossover through the standard risk chain)
//! 2. Metrics summary over a long trade list

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{Duration, TimeZone, Utc};
use risklab_core::domain::Candle;
use risklab_core::engine::{Simulator, SimulatorConfig};
use risklab_core::metrics::MetricsAggregator;
use risklab_core::risk::{CircuitBreaker, RiskLimits, RiskManager};
use risklab_core::strategy::MaCrossover;

// ── Helpers ──────────────────────────────────────────────────────────

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

fn run_once(candles: &[Candle]) -> MetricsAggregator {
    let risk = RiskManager::standard(CircuitBreaker::shared(), &RiskLimits::default());
    let mut sim = Simulator::new(SimulatorConfig::default(), risk).unwrap();
    let mut strategy = MaCrossover::new(10, 30, true).unwrap();
    sim.run(candles, &mut strategy).unwrap();
    sim.metrics().clone()
}

// ── 1. Simulator Bar Loop ────────────────────────────────────────────

fn bench_simulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulator");

    for &bar_count in &[1_000, 5_000] {
        let candles = make_candles(bar_count);
        group.bench_with_input(
            BenchmarkId::new("ma_crossover", bar_count),
            &bar_count,
            |b, _| b.iter(|| run_once(black_box(&candles))),
        );
    }

    group.finish();
}

// ── 2. Metrics Summary ───────────────────────────────────────────────

fn bench_metrics(c: &mut Criterion) {
    let agg = run_once(&make_candles(5_000));
    c.bench_function("metrics_summary", |b| b.iter(|| black_box(&agg).summary()));
}

criterion_group!(benches, bench_simulator, bench_metrics);
criterion_main!(benches);
