//! Performance metrics: the aggregator that owns the trade list and equity
//! curve, plus the pure functions it derives statistics with.
//!
//! Every metric function is pure: equity curve and/or trade list in, scalar
//! out. Degenerate inputs (no trades, flat equity, zero variance) resolve to
//! `0.0`; the only infinities are profit factor without losses and Sortino
//! without downside.

use serde::{Deserialize, Serialize};

use crate::domain::ClosedTrade;

/// Annualization factor used when none is configured.
///
/// Applied regardless of the candle interval; callers running intraday bars
/// should pass the matching number of periods per year.
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

/// Accumulates closed trades into an equity curve.
///
/// Invariant: `equity_curve.len() == trades.len() + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsAggregator {
    initial_capital: f64,
    periods_per_year: f64,
    trades: Vec<ClosedTrade>,
    equity_curve: Vec<f64>,
}

impl MetricsAggregator {
    pub fn new(initial_capital: f64) -> Self {
        Self::with_periods_per_year(initial_capital, DEFAULT_PERIODS_PER_YEAR)
    }

    pub fn with_periods_per_year(initial_capital: f64, periods_per_year: f64) -> Self {
        Self {
            initial_capital,
            periods_per_year,
            trades: Vec::new(),
            equity_curve: vec![initial_capital],
        }
    }

    /// Build a fresh aggregator by replaying `trades` in the given order.
    pub fn from_trades<I>(initial_capital: f64, periods_per_year: f64, trades: I) -> Self
    where
        I: IntoIterator<Item = ClosedTrade>,
    {
        let mut agg = Self::with_periods_per_year(initial_capital, periods_per_year);
        for trade in trades {
            agg.record(trade);
        }
        agg
    }

    /// Append a closed trade and the resulting equity point.
    pub fn record(&mut self, trade: ClosedTrade) {
        let last = self.final_equity();
        self.equity_curve.push(last + trade.pnl);
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[f64] {
        &self.equity_curve
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .copied()
            .unwrap_or(self.initial_capital)
    }

    pub fn summary(&self) -> PerformanceSummary {
        PerformanceSummary::compute(
            self.initial_capital,
            &self.equity_curve,
            &self.trades,
            self.periods_per_year,
        )
    }
}

/// Summary statistics for one run. Percent fields are on a 0–100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub net_pnl: f64,
    pub total_fees: f64,
    pub total_return: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub expectancy: f64,
    #[serde(with = "crate::domain::ratio")]
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    #[serde(with = "crate::domain::ratio")]
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub recovery_factor: f64,
    pub avg_trade_duration_bars: f64,
    pub avg_trade_duration_hours: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub initial_capital: f64,
    pub final_equity: f64,
}

impl PerformanceSummary {
    pub fn compute(
        initial_capital: f64,
        equity_curve: &[f64],
        trades: &[ClosedTrade],
        periods_per_year: f64,
    ) -> Self {
        let winners: Vec<f64> = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).collect();
        let losers: Vec<f64> = trades.iter().filter(|t| t.is_loser()).map(|t| t.pnl).collect();
        let net_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        let (max_dd, max_dd_pct) = max_drawdown(equity_curve);
        let total_return = total_return_pct(equity_curve);

        Self {
            total_trades: trades.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            win_rate: win_rate(trades),
            total_pnl: trades.iter().map(|t| t.gross_pnl).sum(),
            net_pnl,
            total_fees: trades.iter().map(|t| t.fees).sum(),
            total_return,
            avg_win: mean_f64(&winners),
            avg_loss: mean_f64(&losers),
            best_trade: trades.iter().map(|t| t.pnl).fold(None, max_opt).unwrap_or(0.0),
            worst_trade: trades.iter().map(|t| t.pnl).fold(None, min_opt).unwrap_or(0.0),
            expectancy: if trades.is_empty() {
                0.0
            } else {
                net_pnl / trades.len() as f64
            },
            profit_factor: profit_factor(trades),
            max_drawdown: max_dd,
            max_drawdown_pct: max_dd_pct,
            sharpe_ratio: sharpe_ratio(equity_curve, periods_per_year),
            sortino_ratio: sortino_ratio(equity_curve, periods_per_year),
            calmar_ratio: if max_dd_pct > 0.0 {
                total_return / max_dd_pct
            } else {
                0.0
            },
            recovery_factor: recovery_factor(net_pnl, max_dd),
            avg_trade_duration_bars: mean_f64(
                &trades.iter().map(|t| t.bars_held() as f64).collect::<Vec<_>>(),
            ),
            avg_trade_duration_hours: mean_f64(
                &trades.iter().map(|t| t.duration_hours()).collect::<Vec<_>>(),
            ),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
            initial_capital,
            final_equity: equity_curve.last().copied().unwrap_or(initial_capital),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return in percent: (final - initial) / initial * 100.
pub fn total_return_pct(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    let final_eq = equity_curve[equity_curve.len() - 1];
    if initial <= 0.0 {
        return 0.0;
    }
    (final_eq - initial) / initial * 100.0
}

/// Largest peak-to-trough decline, as `(absolute, percent of peak)`.
///
/// Both are non-negative; the two maxima may come from different peaks.
/// The percentage is clamped to `[0, 100]`.
pub fn max_drawdown(equity_curve: &[f64]) -> (f64, f64) {
    let Some(&first) = equity_curve.first() else {
        return (0.0, 0.0);
    };
    let mut peak = first;
    let mut max_abs = 0.0_f64;
    let mut max_pct = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        let decline = peak - eq;
        if decline > max_abs {
            max_abs = decline;
        }
        if peak > 0.0 {
            let pct = decline / peak * 100.0;
            if pct > max_pct {
                max_pct = pct;
            }
        }
    }
    (max_abs, max_pct.min(100.0))
}

/// Win rate in percent.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64 * 100.0
}

/// Profit factor: gross profit / gross loss.
///
/// `+∞` when there are winners but no losers; `0.0` with no trades or no
/// profit at all.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum();

    if gross_loss == 0.0 {
        return if gross_profit > 0.0 { f64::INFINITY } else { 0.0 };
    }
    gross_profit / gross_loss
}

/// Annualized Sharpe ratio of period-over-period equity returns.
///
/// `mean / std * sqrt(periods_per_year)` with population standard deviation.
/// Returns 0.0 when the deviation is zero.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.is_empty() {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * periods_per_year.sqrt()
}

/// Annualized Sortino ratio: mean return over the deviation of negative returns.
///
/// Without any negative return the ratio is `+∞` when the mean is positive and
/// `0.0` otherwise. The downside deviation is the population std of the
/// negative returns, so a single negative return (zero deviation) also
/// yields `0.0`, whatever the mean.
pub fn sortino_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();

    if downside.is_empty() {
        return if mean > 0.0 { f64::INFINITY } else { 0.0 };
    }
    let downside_std = std_dev(&downside);
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean / downside_std * periods_per_year.sqrt()
}

/// Net P&L over the absolute maximum drawdown; 0.0 without drawdown.
pub fn recovery_factor(net_pnl: f64, max_drawdown: f64) -> f64 {
    if max_drawdown.abs() < 1e-12 {
        return 0.0;
    }
    net_pnl / max_drawdown.abs()
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity points.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn max_opt(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.max(v)))
}

fn min_opt(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.min(v)))
}

fn max_consecutive(trades: &[ClosedTrade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        let hit = if winners {
            trade.is_winner()
        } else {
            trade.is_loser()
        };
        if hit {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}
