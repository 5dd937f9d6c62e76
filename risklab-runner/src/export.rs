//! Artifact export: JSON and CSV.
//!
//! - **JSON**: full round-trip serialization of `BacktestResult` with schema
//!   versioning, plus Monte Carlo and walk-forward reports
//! - **CSV**: trade list, rejection audit log and equity curve
//!
//! All persisted backtest results carry a `schema_version` field. Newer
//! versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use risklab_core::domain::{ClosedTrade, RejectedOrder};
use serde::Serialize;

use crate::monte_carlo::MonteCarloReport;
use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::walk_forward::WalkForwardReport;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export closed trades as CSV.
///
/// Columns: side, entry_bar, entry_time, entry_price, exit_bar, exit_time,
/// exit_price, size, leverage, gross_pnl, fees, pnl, pnl_pct, bars_held,
/// exit_reason
pub fn export_trades_csv(trades: &[ClosedTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "size",
        "leverage",
        "gross_pnl",
        "fees",
        "pnl",
        "pnl_pct",
        "bars_held",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            &format!("{:?}", t.side),
            &t.entry_bar.to_string(),
            &t.entry_time.to_rfc3339(),
            &format!("{:.6}", t.entry_price),
            &t.exit_bar.to_string(),
            &t.exit_time.to_rfc3339(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.8}", t.size),
            &format!("{:.2}", t.leverage),
            &format!("{:.2}", t.gross_pnl),
            &format!("{:.2}", t.fees),
            &format!("{:.2}", t.pnl),
            &format!("{:.4}", t.pnl_pct),
            &t.bars_held().to_string(),
            &t.exit_reason.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Export the rejection audit log as CSV.
pub fn export_rejections_csv(rejections: &[RejectedOrder]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "side", "price", "reasons"])?;
    for r in rejections {
        wtr.write_record([
            &r.bar_index.to_string(),
            &r.timestamp.to_rfc3339(),
            &format!("{:?}", r.side),
            &format!("{:.6}", r.price),
            &r.reasons,
        ])?;
    }
    finish(wtr)
}

/// Export an equity curve as CSV. Point 0 is the initial capital; point `n`
/// is equity after the `n`th closed trade.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["trade_index", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([&i.to_string(), &format!("{:.2}", eq)])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates `{symbol}_{run_id prefix}/` under `output_dir` containing:
/// - `summary.json`: the full `BacktestResult`
/// - `trades.json`, `trades.csv`: the closed trades
/// - `rejections.csv`: the risk chain's audit log
/// - `equity.csv`: the per-trade equity curve
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let symbol: String = result
        .symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let run_prefix: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{symbol}_{run_prefix}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("summary.json"), export_json(result)?)?;
    write_json(&result.trades, &run_dir.join("trades.json"))?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(
        run_dir.join("rejections.csv"),
        export_rejections_csv(&result.rejections)?,
    )?;
    std::fs::write(
        run_dir.join("equity.csv"),
        export_equity_csv(&result.equity_curve)?,
    )?;

    Ok(run_dir)
}

/// Write a Monte Carlo report to `output_dir/monte_carlo.json`.
pub fn write_monte_carlo(report: &MonteCarloReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let path = output_dir.join("monte_carlo.json");
    write_json(report, &path)?;
    Ok(path)
}

/// Write a walk-forward report to `output_dir/walk_forward.json`.
pub fn write_walk_forward(report: &WalkForwardReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let path = output_dir.join("walk_forward.json");
    write_json(report, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunConfig, ScriptedSignal, StrategyConfig};
    use crate::runner::run_backtest;
    use chrono::{Duration, TimeZone, Utc};
    use risklab_core::domain::{Candle, SignalKind};

    fn sample_result() -> BacktestResult {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = (0..200)
            .map(|i| Candle::flat(start + Duration::hours(i), 100.0 + i as f64 * 0.1))
            .collect();
        let config = RunConfig {
            strategy: StrategyConfig::Scripted {
                signals: vec![
                    ScriptedSignal { bar: 60, kind: SignalKind::Buy },
                    ScriptedSignal { bar: 80, kind: SignalKind::Close },
                    ScriptedSignal { bar: 100, kind: SignalKind::Buy },
                ],
            },
            ..RunConfig::default()
        };
        run_backtest(&config, &candles, Some("deadbeef")).unwrap()
    }

    #[test]
    fn json_round_trip() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.trades, result.trades);
        assert_eq!(back.summary, result.summary);
        assert_eq!(back.run_id, result.run_id);
    }

    #[test]
    fn rejects_future_schema() {
        let mut value = serde_json::to_value(sample_result()).unwrap();
        value["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
        let err = import_json(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn trades_csv_has_row_per_trade() {
        let result = sample_result();
        let csv = export_trades_csv(&result.trades).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), result.trades.len() + 1);
        assert!(lines[0].starts_with("side,entry_bar"));
        assert!(lines[1].ends_with("Signal"));
    }

    #[test]
    fn equity_csv_starts_at_initial_capital() {
        let csv = export_equity_csv(&[10_000.0, 10_050.5]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["trade_index,equity", "0,10000.00", "1,10050.50"]);
    }

    #[test]
    fn rejections_csv_quotes_reasons() {
        let rejection = RejectedOrder {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            bar_index: 7,
            side: risklab_core::domain::OrderSide::Buy,
            price: 100.0,
            reasons: "Circuit breaker active: manual, halted".into(),
        };
        let csv = export_rejections_csv(&[rejection]).unwrap();
        assert!(csv.contains("\"Circuit breaker active: manual, halted\""));
    }

    #[test]
    fn save_artifacts_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();
        let run_dir = save_artifacts(&result, dir.path()).unwrap();
        for name in [
            "summary.json",
            "trades.json",
            "trades.csv",
            "rejections.csv",
            "equity.csv",
        ] {
            assert!(run_dir.join(name).exists(), "missing {name}");
        }
        let name = run_dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("BTC_USDT_"));

        let summary = std::fs::read_to_string(run_dir.join("summary.json")).unwrap();
        assert_eq!(import_json(&summary).unwrap().trades, result.trades);
    }
}
