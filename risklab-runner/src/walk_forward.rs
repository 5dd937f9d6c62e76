//! Walk-forward validation: calendar train/test windows and out-of-sample
//! evaluation.
//!
//! Windows are laid out in calendar days from the first candle:
//! - rolling: train starts at the cursor
//! - anchored: train always starts at the first candle and grows
//!
//! The cursor advances by `step_days` after every window, emitted or
//! skipped. A window is skipped when either side holds too few candles.
//! Layout stops once a test window would end past the last candle.
//!
//! Each side of each window runs its own simulator with fresh capital, a
//! fresh strategy and a fresh risk chain. The test run is handed up to
//! `warmup_bars` candles preceding the test window as warmup history, so
//! indicator-based strategies can trade from the first test bar without
//! reading any candle after it.

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use risklab_core::domain::Candle;
use risklab_core::engine::SimulationReport;
use risklab_core::risk::CircuitBreaker;

use crate::config::{ConfigError, RunConfig};
use crate::runner::{simulate, RunError};
use crate::stats::DistributionStats;

/// Efficiency ratio at or above which a window counts as efficient.
pub const EFFICIENT_WINDOW_RATIO: f64 = 0.5;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    pub train_days: u32,
    pub test_days: u32,
    pub step_days: u32,
    /// Fix the train start at the first candle.
    pub anchored: bool,
    /// Minimum candles in the train side of an emitted window (default 50).
    pub min_train_candles: usize,
    /// Minimum candles in the test side of an emitted window (default 10).
    pub min_test_candles: usize,
    /// Evaluate windows on the rayon pool.
    pub parallel: bool,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_days: 60,
            test_days: 20,
            step_days: 20,
            anchored: false,
            min_train_candles: 50,
            min_test_candles: 10,
            parallel: true,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Calendar bounds and candle index ranges of one window. Ends are exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub index: usize,
    pub train_start: DateTime<Utc>,
    pub train_end: DateTime<Utc>,
    pub test_start: DateTime<Utc>,
    pub test_end: DateTime<Utc>,
    pub train_range: (usize, usize),
    pub test_range: (usize, usize),
}

impl WindowBounds {
    pub fn train_candles(&self) -> usize {
        self.train_range.1 - self.train_range.0
    }

    pub fn test_candles(&self) -> usize {
        self.test_range.1 - self.test_range.0
    }
}

/// A window dropped for holding too few candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedWindow {
    pub index: usize,
    pub train_start: DateTime<Utc>,
    pub test_end: DateTime<Utc>,
    pub train_candles: usize,
    pub test_candles: usize,
}

/// Headline metrics of one side of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliceMetrics {
    pub total_return: f64,
    pub net_pnl: f64,
    pub sharpe_ratio: f64,
    pub win_rate: f64,
    #[serde(with = "risklab_core::domain::ratio")]
    pub profit_factor: f64,
    pub max_drawdown_pct: f64,
    pub total_trades: usize,
    pub rejected_trades: usize,
}

impl SliceMetrics {
    fn from_report(report: &SimulationReport) -> Self {
        let s = &report.summary;
        Self {
            total_return: s.total_return,
            net_pnl: s.net_pnl,
            sharpe_ratio: s.sharpe_ratio,
            win_rate: s.win_rate,
            profit_factor: s.profit_factor,
            max_drawdown_pct: s.max_drawdown_pct,
            total_trades: s.total_trades,
            rejected_trades: report.rejected_trades,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    pub bounds: WindowBounds,
    pub train: SliceMetrics,
    pub test: SliceMetrics,
    /// `test_return / train_return`, 0 when the train return is 0.
    pub efficiency_ratio: f64,
}

/// Averages over one side of all evaluated windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideAverages {
    pub avg_return: f64,
    pub avg_sharpe: f64,
    pub avg_win_rate: f64,
    /// Mean over windows with a finite profit factor.
    pub avg_profit_factor: f64,
    pub avg_max_drawdown_pct: f64,
}

impl SideAverages {
    fn from_slices<'a>(slices: impl Iterator<Item = &'a SliceMetrics> + Clone) -> Self {
        let mean = |f: fn(&SliceMetrics) -> f64| {
            let values: Vec<f64> = slices.clone().map(f).collect();
            risklab_core::metrics::mean_f64(&values)
        };
        let finite_pf: Vec<f64> = slices
            .clone()
            .map(|s| s.profit_factor)
            .filter(|pf| pf.is_finite())
            .collect();
        Self {
            avg_return: mean(|s| s.total_return),
            avg_sharpe: mean(|s| s.sharpe_ratio),
            avg_win_rate: mean(|s| s.win_rate),
            avg_profit_factor: risklab_core::metrics::mean_f64(&finite_pf),
            avg_max_drawdown_pct: mean(|s| s.max_drawdown_pct),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub anchored: bool,
    pub windows: Vec<WindowResult>,
    pub skipped: Vec<SkippedWindow>,
    pub train_return_stats: DistributionStats,
    pub test_return_stats: DistributionStats,
    pub train: SideAverages,
    pub test: SideAverages,
    pub profitable_test_windows: usize,
    /// Windows with `efficiency_ratio >= 0.5`.
    pub efficient_windows: usize,
    /// `(avg_test_return - avg_train_return) / |avg_train_return| * 100`, 0
    /// when the average train return is 0.
    pub degradation_pct: f64,
}

/// Errors from walk-forward validation.
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("empty candle series")]
    EmptySeries,
    #[error("no window holds {min_train} train and {min_test} test candles ({skipped} skipped)")]
    NoWindows {
        min_train: usize,
        min_test: usize,
        skipped: usize,
    },
    #[error("backtest error on window {window} ({side}): {source}")]
    BacktestFailed {
        window: usize,
        side: &'static str,
        #[source]
        source: RunError,
    },
}

// ─── Window layout ───────────────────────────────────────────────────

/// Index of the first candle at or after `t`.
fn lower_bound(candles: &[Candle], t: DateTime<Utc>) -> usize {
    candles.partition_point(|c| c.timestamp < t)
}

/// Lay out train/test windows over `candles`, which must be time-ordered.
pub fn generate_windows(
    candles: &[Candle],
    config: &WalkForwardConfig,
) -> (Vec<WindowBounds>, Vec<SkippedWindow>) {
    let mut windows = Vec::new();
    let mut skipped = Vec::new();
    let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
        return (windows, skipped);
    };
    if config.step_days == 0 {
        return (windows, skipped);
    }

    let series_start = first.timestamp;
    let series_end = last.timestamp;
    let train_len = Duration::days(i64::from(config.train_days));
    let test_len = Duration::days(i64::from(config.test_days));
    let step = Duration::days(i64::from(config.step_days));

    let mut cursor = series_start;
    let mut index = 0;
    loop {
        let train_start = if config.anchored { series_start } else { cursor };
        let train_end = cursor + train_len;
        let test_start = train_end;
        let test_end = test_start + test_len;
        if test_end > series_end {
            break;
        }

        let train_range = (lower_bound(candles, train_start), lower_bound(candles, train_end));
        let test_range = (train_range.1, lower_bound(candles, test_end));
        let train_candles = train_range.1 - train_range.0;
        let test_candles = test_range.1 - test_range.0;

        if train_candles >= config.min_train_candles && test_candles >= config.min_test_candles {
            windows.push(WindowBounds {
                index,
                train_start,
                train_end,
                test_start,
                test_end,
                train_range,
                test_range,
            });
        } else {
            debug!(index, train_candles, test_candles, "walk-forward window skipped");
            skipped.push(SkippedWindow {
                index,
                train_start,
                test_end,
                train_candles,
                test_candles,
            });
        }

        index += 1;
        cursor = cursor + step;
    }
    (windows, skipped)
}

// ─── Evaluation ──────────────────────────────────────────────────────

fn run_side(
    config: &RunConfig,
    candles: &[Candle],
    warmup_bars: usize,
) -> Result<SimulationReport, RunError> {
    let mut simulation = config.simulation.clone();
    simulation.warmup_bars = warmup_bars;
    let mut strategy = config.strategy.build()?;
    simulate(
        &simulation,
        config,
        candles,
        strategy.as_mut(),
        CircuitBreaker::shared(),
    )
}

fn evaluate_window(
    config: &RunConfig,
    candles: &[Candle],
    bounds: &WindowBounds,
) -> Result<WindowResult, WalkForwardError> {
    let window = bounds.index;
    let failed = |side: &'static str| {
        move |source: RunError| WalkForwardError::BacktestFailed {
            window,
            side,
            source,
        }
    };

    let (train_lo, train_hi) = bounds.train_range;
    let train = run_side(
        config,
        &candles[train_lo..train_hi],
        config.simulation.warmup_bars,
    )
    .map_err(failed("train"))?;

    let (test_lo, test_hi) = bounds.test_range;
    let history = test_lo.min(config.simulation.warmup_bars);
    let test = run_side(config, &candles[test_lo - history..test_hi], history)
        .map_err(failed("test"))?;

    let train = SliceMetrics::from_report(&train);
    let test = SliceMetrics::from_report(&test);
    let efficiency_ratio = if train.total_return == 0.0 {
        0.0
    } else {
        test.total_return / train.total_return
    };

    Ok(WindowResult {
        bounds: bounds.clone(),
        train,
        test,
        efficiency_ratio,
    })
}

/// Run walk-forward validation over `candles` with `config.walk_forward`.
pub fn run_walk_forward(
    config: &RunConfig,
    candles: &[Candle],
) -> Result<WalkForwardReport, WalkForwardError> {
    config.validate()?;
    if candles.is_empty() {
        return Err(WalkForwardError::EmptySeries);
    }
    let wf = &config.walk_forward;
    let (layout, skipped) = generate_windows(candles, wf);
    if layout.is_empty() {
        return Err(WalkForwardError::NoWindows {
            min_train: wf.min_train_candles,
            min_test: wf.min_test_candles,
            skipped: skipped.len(),
        });
    }

    let windows: Vec<WindowResult> = if wf.parallel {
        layout
            .par_iter()
            .map(|bounds| evaluate_window(config, candles, bounds))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        layout
            .iter()
            .map(|bounds| evaluate_window(config, candles, bounds))
            .collect::<Result<Vec<_>, _>>()?
    };

    let report = summarize(wf.anchored, windows, skipped);
    info!(
        windows = report.windows.len(),
        skipped = report.skipped.len(),
        avg_train_return = report.train.avg_return,
        avg_test_return = report.test.avg_return,
        degradation_pct = report.degradation_pct,
        "walk-forward complete"
    );
    Ok(report)
}

fn summarize(
    anchored: bool,
    windows: Vec<WindowResult>,
    skipped: Vec<SkippedWindow>,
) -> WalkForwardReport {
    let train_returns: Vec<f64> = windows.iter().map(|w| w.train.total_return).collect();
    let test_returns: Vec<f64> = windows.iter().map(|w| w.test.total_return).collect();
    let train = SideAverages::from_slices(windows.iter().map(|w| &w.train));
    let test = SideAverages::from_slices(windows.iter().map(|w| &w.test));

    let degradation_pct = if train.avg_return == 0.0 {
        0.0
    } else {
        (test.avg_return - train.avg_return) / train.avg_return.abs() * 100.0
    };

    WalkForwardReport {
        anchored,
        train_return_stats: DistributionStats::from_values(&train_returns),
        test_return_stats: DistributionStats::from_values(&test_returns),
        profitable_test_windows: windows.iter().filter(|w| w.test.total_return > 0.0).count(),
        efficient_windows: windows
            .iter()
            .filter(|w| w.efficiency_ratio >= EFFICIENT_WINDOW_RATIO)
            .count(),
        train,
        test,
        degradation_pct,
        windows,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Hourly candles over `days` days with a gentle oscillation.
    fn hourly(days: i64) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..days * 24)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.07).sin() * 5.0;
                Candle::flat(start + Duration::hours(i), close)
            })
            .collect()
    }

    fn wf(train: u32, test: u32, step: u32, anchored: bool) -> WalkForwardConfig {
        WalkForwardConfig {
            train_days: train,
            test_days: test,
            step_days: step,
            anchored,
            ..WalkForwardConfig::default()
        }
    }

    #[test]
    fn rolling_windows_advance_by_step() {
        let candles = hourly(31);
        let (windows, skipped) = generate_windows(&candles, &wf(10, 5, 5, false));
        assert!(skipped.is_empty());
        // cursor at day 0, 5, 10, 15; day 20 would end at day 35, past the last candle
        assert_eq!(windows.len(), 4);
        for pair in windows.windows(2) {
            assert_eq!(pair[1].train_start - pair[0].train_start, Duration::days(5));
        }
        for w in &windows {
            assert_eq!(w.train_candles(), 240);
            assert_eq!(w.test_candles(), 120);
            assert_eq!(w.train_range.1, w.test_range.0);
        }
    }

    #[test]
    fn anchored_windows_share_start() {
        let candles = hourly(31);
        let (windows, _) = generate_windows(&candles, &wf(10, 5, 5, true));
        let first = candles[0].timestamp;
        assert!(windows.iter().all(|w| w.train_start == first));
        assert!(windows
            .windows(2)
            .all(|p| p[1].train_candles() > p[0].train_candles()));
    }

    #[test]
    fn sparse_windows_are_skipped_and_cursor_advances() {
        // Daily candles: 10-day train has 10 candles, below the 50 minimum.
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = (0..40)
            .map(|i| Candle::flat(start + Duration::days(i), 100.0))
            .collect();
        let (windows, skipped) = generate_windows(&candles, &wf(10, 5, 5, false));
        assert!(windows.is_empty());
        assert_eq!(skipped.len(), 5);
        assert_eq!(skipped[1].index, 1);
        assert_eq!(skipped[0].train_candles, 10);
    }

    #[test]
    fn no_windows_when_series_too_short() {
        let candles = hourly(3);
        let (windows, skipped) = generate_windows(&candles, &wf(10, 5, 5, false));
        assert!(windows.is_empty() && skipped.is_empty());
    }

    #[test]
    fn run_reports_every_window() {
        let config = RunConfig {
            walk_forward: wf(10, 5, 5, false),
            ..RunConfig::default()
        };
        let report = run_walk_forward(&config, &hourly(31)).unwrap();
        assert_eq!(report.windows.len(), 4);
        assert_eq!(report.train_return_stats.count, 4);
        for w in &report.windows {
            if w.train.total_return == 0.0 {
                assert_eq!(w.efficiency_ratio, 0.0);
            }
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut config = RunConfig {
            walk_forward: wf(10, 5, 5, false),
            ..RunConfig::default()
        };
        let par = run_walk_forward(&config, &hourly(31)).unwrap();
        config.walk_forward.parallel = false;
        let seq = run_walk_forward(&config, &hourly(31)).unwrap();
        assert_eq!(par.windows, seq.windows);
    }

    #[test]
    fn degradation_and_efficiency_summary() {
        let bounds = WindowBounds {
            index: 0,
            train_start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            train_end: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            test_start: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            test_end: Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
            train_range: (0, 50),
            test_range: (50, 60),
        };
        let slice = |ret: f64, pf: f64| SliceMetrics {
            total_return: ret,
            net_pnl: ret * 100.0,
            sharpe_ratio: 1.0,
            win_rate: 50.0,
            profit_factor: pf,
            max_drawdown_pct: 2.0,
            total_trades: 4,
            rejected_trades: 0,
        };
        let windows = vec![
            WindowResult {
                bounds: bounds.clone(),
                train: slice(10.0, 2.0),
                test: slice(6.0, f64::INFINITY),
                efficiency_ratio: 0.6,
            },
            WindowResult {
                bounds,
                train: slice(10.0, 4.0),
                test: slice(-2.0, 0.5),
                efficiency_ratio: -0.2,
            },
        ];
        let report = summarize(false, windows, Vec::new());
        assert_eq!(report.train.avg_return, 10.0);
        assert_eq!(report.test.avg_return, 2.0);
        assert!((report.degradation_pct + 80.0).abs() < 1e-12);
        assert_eq!(report.profitable_test_windows, 1);
        assert_eq!(report.efficient_windows, 1);
        assert_eq!(report.train.avg_profit_factor, 3.0);
        // infinite profit factor is excluded from the average
        assert_eq!(report.test.avg_profit_factor, 0.5);
    }

    #[test]
    fn empty_series_is_error() {
        assert!(matches!(
            run_walk_forward(&RunConfig::default(), &[]),
            Err(WalkForwardError::EmptySeries)
        ));
    }
}
