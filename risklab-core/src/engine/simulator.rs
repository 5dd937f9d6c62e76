//! Execution simulator: a single pass over a candle series.
//!
//! Per bar, after warmup:
//! 1. Ask the strategy for a signal on `candles[..=i]`
//! 2. Handle the signal (confirmation, cooldown, min-holding, risk check)
//! 3. Check stop-loss / take-profit on the open position at the close
//!
//! Any position still open after the last bar is closed with reason `End`.
//! Rejections are data, not errors; only invalid prices, non-finite
//! accounting and strategy failures stop a run. The simulator keeps its
//! state after an error so partial results stay inspectable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::config::{ConfigError, SimulatorConfig};
use super::costs::CostModel;
use crate::domain::{
    Candle, ClosedTrade, ExitReason, OrderRequest, OrderSide, Position, PositionSide,
    RejectedOrder, Signal, SignalKind,
};
use crate::metrics::{period_returns, std_dev, MetricsAggregator, PerformanceSummary};
use crate::risk::{RiskContext, RiskManager};
use crate::strategy::{Strategy, StrategyError};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid price {price} at bar {bar}")]
    InvalidPrice { bar: usize, price: f64 },

    #[error("non-finite {what} at bar {bar}")]
    NumericOverflow { bar: usize, what: &'static str },

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("invalid simulator configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Per-run activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationCounters {
    pub bars_processed: usize,
    /// Non-HOLD signals received from the strategy.
    pub signals_seen: usize,
    pub entries_confirmed: usize,
    pub entries_rejected: usize,
    /// CLOSE signals ignored because the position was younger than `min_holding_bars`.
    pub closes_ignored: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub summary: PerformanceSummary,
    pub trades: Vec<ClosedTrade>,
    pub rejections: Vec<RejectedOrder>,
    pub equity_curve: Vec<f64>,
    pub final_capital: f64,
    pub rejected_trades: usize,
    pub counters: SimulationCounters,
}

/// Resumable simulator state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub capital: f64,
    pub open_position: Option<Position>,
    pub trades: Vec<ClosedTrade>,
    pub rejections: Vec<RejectedOrder>,
    pub summary: PerformanceSummary,
    /// Next bar index the simulator will process.
    pub next_bar: usize,
    pub last_exit_bar: Option<usize>,
    pub counters: SimulationCounters,
}

/// Consecutive same-kind entry signals seen so far.
#[derive(Debug, Clone, Copy)]
struct Confirmation {
    kind: SignalKind,
    count: usize,
}

#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    costs: CostModel,
    risk: RiskManager,

    // ─── Mutable state ───
    capital: f64,
    position: Option<Position>,
    metrics: MetricsAggregator,
    rejections: Vec<RejectedOrder>,
    next_bar: usize,
    last_exit_bar: Option<usize>,
    confirmation: Option<Confirmation>,
    counters: SimulationCounters,
}

impl Simulator {
    pub fn new(config: SimulatorConfig, risk: RiskManager) -> Result<Self, ConfigError> {
        config.validate()?;
        let costs = CostModel::new(config.maker_fee, config.taker_fee, config.slippage_rate);
        Ok(Self {
            capital: config.initial_capital,
            metrics: MetricsAggregator::with_periods_per_year(
                config.initial_capital,
                config.periods_per_year,
            ),
            config,
            costs,
            risk,
            position: None,
            rejections: Vec::new(),
            next_bar: 0,
            last_exit_bar: None,
            confirmation: None,
            counters: SimulationCounters::default(),
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        self.metrics.trades()
    }

    pub fn rejections(&self) -> &[RejectedOrder] {
        &self.rejections
    }

    pub fn counters(&self) -> SimulationCounters {
        self.counters
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn risk_mut(&mut self) -> &mut RiskManager {
        &mut self.risk
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            capital: self.capital,
            open_position: self.position.clone(),
            trades: self.metrics.trades().to_vec(),
            rejections: self.rejections.clone(),
            summary: self.metrics.summary(),
            next_bar: self.next_bar,
            last_exit_bar: self.last_exit_bar,
            counters: self.counters,
        }
    }

    /// Replace the mutable state with `snapshot`. The confirmation counter
    /// starts empty.
    pub fn restore(&mut self, snapshot: SimulationSnapshot) {
        self.capital = snapshot.capital;
        self.position = snapshot.open_position;
        self.metrics = MetricsAggregator::from_trades(
            self.config.initial_capital,
            self.config.periods_per_year,
            snapshot.trades,
        );
        self.rejections = snapshot.rejections;
        self.next_bar = snapshot.next_bar;
        self.last_exit_bar = snapshot.last_exit_bar;
        self.confirmation = None;
        self.counters = snapshot.counters;
    }

    /// Process `candles` from the next unprocessed bar to the end.
    ///
    /// `candles` must be the full series: the strategy always sees
    /// `candles[..=i]`.
    pub fn run(
        &mut self,
        candles: &[Candle],
        strategy: &mut dyn Strategy,
    ) -> Result<SimulationReport, SimulationError> {
        let start = self.next_bar;
        for (i, candle) in candles.iter().enumerate().skip(start) {
            self.step(candles, i, candle, strategy)?;
            self.next_bar = i + 1;
        }

        if self.position.is_some() {
            if let Some(last) = candles.last() {
                let bar = candles.len() - 1;
                let fill = self.exit_fill(last.close);
                self.close_position(bar, last, fill, ExitReason::End)?;
            }
        }

        let report = self.report();
        info!(
            strategy = strategy.name(),
            bars = candles.len(),
            trades = report.summary.total_trades,
            rejected = report.rejected_trades,
            net_pnl = report.summary.net_pnl,
            total_return_pct = report.summary.total_return,
            "simulation complete"
        );
        Ok(report)
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            summary: self.metrics.summary(),
            trades: self.metrics.trades().to_vec(),
            rejections: self.rejections.clone(),
            equity_curve: self.metrics.equity_curve().to_vec(),
            final_capital: self.capital,
            rejected_trades: self.rejections.len(),
            counters: self.counters,
        }
    }

    fn step(
        &mut self,
        candles: &[Candle],
        i: usize,
        candle: &Candle,
        strategy: &mut dyn Strategy,
    ) -> Result<(), SimulationError> {
        if !(candle.close.is_finite() && candle.close > 0.0) {
            return Err(SimulationError::InvalidPrice {
                bar: i,
                price: candle.close,
            });
        }
        if i < self.config.warmup_bars {
            return Ok(());
        }
        self.counters.bars_processed += 1;

        let signal = Signal::sanitize(strategy.on_bar(&candles[..=i])?);
        if signal.kind != SignalKind::Hold {
            self.counters.signals_seen += 1;
        }

        let in_cooldown = self
            .last_exit_bar
            .is_some_and(|exit| i - exit < self.config.cooldown_bars);

        match signal.kind {
            SignalKind::Hold => self.confirmation = None,
            SignalKind::Buy | SignalKind::Sell => {
                if self.position.is_some() {
                    self.confirmation = None;
                } else if !in_cooldown && self.confirm(signal.kind) {
                    self.counters.entries_confirmed += 1;
                    self.try_open(candles, i, candle, signal.kind)?;
                }
            }
            SignalKind::Close => {
                self.confirmation = None;
                if let Some(position) = &self.position {
                    let held = position.bars_held(i);
                    if held < self.config.min_holding_bars {
                        self.counters.closes_ignored += 1;
                        debug!(bar = i, held, min = self.config.min_holding_bars, "close ignored");
                    } else {
                        let fill = self.exit_fill(candle.close);
                        self.close_position(i, candle, fill, ExitReason::Signal)?;
                    }
                }
            }
        }

        self.check_exits(i, candle)
    }

    /// Count consecutive same-kind entry signals. True once the run reaches
    /// `confirmation_bars`, which resets the counter.
    fn confirm(&mut self, kind: SignalKind) -> bool {
        let count = match self.confirmation {
            Some(c) if c.kind == kind => c.count + 1,
            _ => 1,
        };
        if count >= self.config.confirmation_bars.max(1) {
            self.confirmation = None;
            true
        } else {
            self.confirmation = Some(Confirmation { kind, count });
            false
        }
    }

    /// Population std of the last `volatility_lookback` close-to-close returns.
    fn volatility(&self, candles: &[Candle], i: usize) -> Option<f64> {
        let lookback = self.config.volatility_lookback;
        if i < lookback {
            return None;
        }
        let closes: Vec<f64> = candles[i - lookback..=i].iter().map(|c| c.close).collect();
        Some(std_dev(&period_returns(&closes)))
    }

    fn try_open(
        &mut self,
        candles: &[Candle],
        i: usize,
        candle: &Candle,
        kind: SignalKind,
    ) -> Result<(), SimulationError> {
        let (side, order_side) = match kind {
            SignalKind::Sell => (PositionSide::Short, OrderSide::Sell),
            _ => (PositionSide::Long, OrderSide::Buy),
        };
        let fill_price = self.costs.apply_slippage(candle.close, order_side);
        let leverage = self.config.leverage;
        let notional = self.capital * self.config.position_size_fraction * leverage;

        if notional <= 0.0 {
            let reason = format!("No capital available ({:.2})", self.capital);
            self.reject(i, candle.timestamp, order_side, fill_price, reason);
            return Ok(());
        }

        let order = OrderRequest {
            symbol: self.config.symbol.clone(),
            side: order_side,
            amount: notional / fill_price,
            price: fill_price,
            leverage,
        };
        let mut context = RiskContext::new(self.capital, candle.close, candle.timestamp)
            .with_stop_loss_pct(self.config.stop_loss_pct);
        if let Some(vol) = self.volatility(candles, i) {
            context = context.with_volatility(vol);
        }

        self.risk.observe_capital(self.capital, context.date());
        let decision = self.risk.validate_order(&order, &context);
        if !decision.approved {
            self.reject(i, candle.timestamp, order_side, fill_price, decision.reasons());
            return Ok(());
        }

        let margin = notional / leverage;
        let entry_fee = self.costs.fee(notional, false);
        self.capital -= margin + entry_fee;
        ensure_finite(i, self.capital, "capital")?;

        let (stop_loss, take_profit) = match side {
            PositionSide::Long => (
                fill_price * (1.0 - self.config.stop_loss_pct),
                fill_price * (1.0 + self.config.take_profit_pct),
            ),
            PositionSide::Short => (
                fill_price * (1.0 + self.config.stop_loss_pct),
                fill_price * (1.0 - self.config.take_profit_pct),
            ),
        };

        debug!(
            bar = i,
            %side,
            price = fill_price,
            notional,
            margin,
            fee = entry_fee,
            "position opened"
        );
        self.position = Some(Position {
            side,
            entry_price: fill_price,
            entry_time: candle.timestamp,
            entry_bar: i,
            size: margin / fill_price,
            leverage,
            margin,
            entry_fee,
            stop_loss,
            take_profit,
        });
        Ok(())
    }

    fn reject(
        &mut self,
        i: usize,
        timestamp: DateTime<Utc>,
        side: OrderSide,
        price: f64,
        reasons: String,
    ) {
        debug!(bar = i, %side, price, %reasons, "entry rejected");
        self.counters.entries_rejected += 1;
        self.rejections.push(RejectedOrder {
            timestamp,
            bar_index: i,
            side,
            price,
            reasons,
        });
    }

    /// Close price after adverse slippage for the exit side of the open position.
    fn exit_fill(&self, close: f64) -> f64 {
        match self.position.as_ref().map(|p| p.side) {
            Some(PositionSide::Short) => self.costs.apply_slippage(close, OrderSide::Buy),
            _ => self.costs.apply_slippage(close, OrderSide::Sell),
        }
    }

    /// Stop-loss and take-profit at the bar close, then the risk chain's
    /// position-level stop.
    fn check_exits(&mut self, i: usize, candle: &Candle) -> Result<(), SimulationError> {
        let Some(position) = &self.position else {
            return Ok(());
        };
        let price = candle.close;

        if position.stop_loss_hit(price) {
            let level = position.stop_loss;
            return self.close_position(i, candle, level, ExitReason::StopLoss);
        }
        if position.take_profit_hit(price) {
            let level = position.take_profit;
            return self.close_position(i, candle, level, ExitReason::TakeProfit);
        }
        if let Some(outcome) = self.risk.check_position(position, price) {
            if outcome.is_rejected() {
                debug!(bar = i, message = %outcome.message, "risk stop forced exit");
                return self.close_position(i, candle, price, ExitReason::StopLoss);
            }
        }
        Ok(())
    }

    fn close_position(
        &mut self,
        i: usize,
        candle: &Candle,
        exit_price: f64,
        reason: ExitReason,
    ) -> Result<(), SimulationError> {
        let Some(position) = self.position.take() else {
            return Ok(());
        };

        let exit_notional = position.notional(exit_price);
        let exit_fee = self.costs.fee(exit_notional, reason.is_resting());
        let gross_pnl = position.unrealized_pnl(exit_price);
        let pnl = gross_pnl - position.entry_fee - exit_fee;

        self.capital += position.margin + gross_pnl - exit_fee;
        ensure_finite(i, self.capital, "capital")?;
        ensure_finite(i, pnl, "pnl")?;

        let trade = ClosedTrade {
            side: position.side,
            entry_bar: position.entry_bar,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_bar: i,
            exit_time: candle.timestamp,
            exit_price,
            size: position.size,
            leverage: position.leverage,
            gross_pnl,
            pnl,
            pnl_pct: if position.margin > 0.0 {
                pnl / position.margin * 100.0
            } else {
                0.0
            },
            fees: position.entry_fee + exit_fee,
            exit_reason: reason,
        };
        debug!(
            bar = i,
            side = %trade.side,
            exit_price,
            pnl,
            reason = %reason,
            "position closed"
        );
        self.metrics.record(trade);
        self.last_exit_bar = Some(i);
        self.risk
            .observe_capital(self.capital, candle.timestamp.date_naive());
        Ok(())
    }
}

fn ensure_finite(bar: usize, value: f64, what: &'static str) -> Result<(), SimulationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::NumericOverflow { bar, what })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::CircuitBreaker;
    use crate::strategy::ScriptedStrategy;
    use chrono::{Duration, TimeZone};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::flat(start + Duration::hours(i as i64), c))
            .collect()
    }

    fn frictionless() -> SimulatorConfig {
        SimulatorConfig {
            maker_fee: 0.0,
            taker_fee: 0.0,
            slippage_rate: 0.0,
            position_size_fraction: 0.5,
            warmup_bars: 1,
            stop_loss_pct: 0.5,
            take_profit_pct: 5.0,
            ..SimulatorConfig::default()
        }
    }

    fn sim(config: SimulatorConfig) -> Simulator {
        Simulator::new(config, RiskManager::new(CircuitBreaker::shared())).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SimulatorConfig {
            initial_capital: 0.0,
            ..SimulatorConfig::default()
        };
        assert!(Simulator::new(config, RiskManager::new(CircuitBreaker::shared())).is_err());
    }

    #[test]
    fn long_round_trip_accounting() {
        let bars = candles(&[100.0, 100.0, 110.0, 110.0]);
        let mut strategy = ScriptedStrategy::new()
            .at(1, SignalKind::Buy)
            .at(2, SignalKind::Close);
        let mut s = sim(frictionless());
        let report = s.run(&bars, &mut strategy).unwrap();

        assert_eq!(report.trades.len(), 1);
        let t = &report.trades[0];
        // margin 5_000 at 100 → size 50, pnl 50 * 10
        assert!((t.pnl - 500.0).abs() < 1e-9);
        assert!((t.pnl_pct - 10.0).abs() < 1e-9);
        assert!((report.final_capital - 10_500.0).abs() < 1e-9);
        assert_eq!(report.equity_curve.len(), 2);
    }

    #[test]
    fn short_round_trip_with_leverage() {
        let bars = candles(&[100.0, 100.0, 90.0, 90.0]);
        let mut strategy = ScriptedStrategy::new()
            .at(1, SignalKind::Sell)
            .at(2, SignalKind::Close);
        let mut s = sim(SimulatorConfig {
            leverage: 2.0,
            position_size_fraction: 0.1,
            ..frictionless()
        });
        let report = s.run(&bars, &mut strategy).unwrap();
        let t = &report.trades[0];
        // notional 2_000 → margin 1_000, size 10, pnl (90-100) * 10 * 2 * -1
        assert_eq!(t.side, PositionSide::Short);
        assert!((t.pnl - 200.0).abs() < 1e-9);
        assert!((t.pnl_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn fees_and_slippage_reduce_pnl() {
        let bars = candles(&[100.0, 100.0, 100.0]);
        let mut strategy = ScriptedStrategy::new()
            .at(1, SignalKind::Buy)
            .at(2, SignalKind::Close);
        let mut s = sim(SimulatorConfig {
            taker_fee: 0.001,
            slippage_rate: 0.001,
            ..frictionless()
        });
        let report = s.run(&bars, &mut strategy).unwrap();
        let t = &report.trades[0];
        assert!((t.entry_price - 100.1).abs() < 1e-9);
        assert!((t.exit_price - 99.9).abs() < 1e-9);
        assert!(t.fees > 0.0);
        assert!(t.pnl < t.gross_pnl);
        assert!((report.final_capital - (10_000.0 + t.pnl)).abs() < 1e-9);
    }

    #[test]
    fn stop_loss_fills_at_level_with_maker_fee() {
        let bars = candles(&[100.0, 100.0, 97.0]);
        let mut strategy = ScriptedStrategy::new().at(1, SignalKind::Buy);
        let mut s = sim(SimulatorConfig {
            stop_loss_pct: 0.02,
            maker_fee: 0.001,
            taker_fee: 0.0,
            ..frictionless()
        });
        let report = s.run(&bars, &mut strategy).unwrap();
        let t = &report.trades[0];
        assert_eq!(t.exit_reason, ExitReason::StopLoss);
        assert!((t.exit_price - 98.0).abs() < 1e-9);
        assert!((t.fees - 50.0 * 98.0 * 0.001).abs() < 1e-9);
    }

    #[test]
    fn take_profit_closes_position() {
        let bars = candles(&[100.0, 100.0, 106.0]);
        let mut strategy = ScriptedStrategy::new().at(1, SignalKind::Buy);
        let mut s = sim(SimulatorConfig {
            take_profit_pct: 0.05,
            ..frictionless()
        });
        let report = s.run(&bars, &mut strategy).unwrap();
        assert_eq!(report.trades[0].exit_reason, ExitReason::TakeProfit);
        assert!((report.trades[0].exit_price - 105.0).abs() < 1e-9);
    }

    #[test]
    fn open_position_closed_at_end() {
        let bars = candles(&[100.0, 100.0, 101.0]);
        let mut strategy = ScriptedStrategy::new().at(1, SignalKind::Buy);
        let mut s = sim(frictionless());
        let report = s.run(&bars, &mut strategy).unwrap();
        assert_eq!(report.trades[0].exit_reason, ExitReason::End);
        assert_eq!(report.trades[0].exit_bar, 2);
        assert!(s.position().is_none());
    }

    #[test]
    fn entry_signal_ignored_while_position_open() {
        let bars = candles(&[100.0; 5]);
        let mut strategy = ScriptedStrategy::new().repeat(1..4, SignalKind::Buy);
        let mut s = sim(frictionless());
        let report = s.run(&bars, &mut strategy).unwrap();
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.counters.entries_confirmed, 1);
    }

    #[test]
    fn invalid_price_is_fatal_and_keeps_partial_state() {
        let mut closes = vec![100.0; 4];
        closes.push(0.0);
        let bars = candles(&closes);
        let mut strategy = ScriptedStrategy::new()
            .at(1, SignalKind::Buy)
            .at(2, SignalKind::Close);
        let mut s = sim(frictionless());
        let err = s.run(&bars, &mut strategy).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidPrice { bar: 4, .. }));
        assert_eq!(s.trades().len(), 1);
        assert_eq!(s.snapshot().next_bar, 4);
    }

    #[test]
    fn strategy_error_propagates() {
        let bars = candles(&[100.0; 4]);
        let mut strategy = ScriptedStrategy::new().failing_at(2);
        let mut s = sim(frictionless());
        assert!(matches!(
            s.run(&bars, &mut strategy),
            Err(SimulationError::Strategy(_))
        ));
    }

    #[test]
    fn malformed_signal_is_hold() {
        let bars = candles(&[100.0; 4]);
        let mut strategy =
            ScriptedStrategy::new().with_signal(1, Signal::new(SignalKind::Buy, f64::NAN, "bad"));
        let mut s = sim(frictionless());
        let report = s.run(&bars, &mut strategy).unwrap();
        assert!(report.trades.is_empty());
        assert_eq!(report.counters.signals_seen, 0);
    }

    #[test]
    fn snapshot_restore_resumes_identically() {
        let bars = candles(&[100.0, 100.0, 105.0, 105.0, 110.0, 110.0]);
        let script = ScriptedStrategy::new()
            .at(1, SignalKind::Buy)
            .at(2, SignalKind::Close)
            .at(3, SignalKind::Buy)
            .at(4, SignalKind::Close);

        let mut straight = sim(frictionless());
        let expected = straight.run(&bars, &mut script.clone()).unwrap();

        let mut first = sim(frictionless());
        let mut partial = script.clone().failing_at(3);
        assert!(first.run(&bars, &mut partial).is_err());
        let snapshot = first.snapshot();

        let mut resumed = sim(frictionless());
        resumed.restore(snapshot);
        let report = resumed.run(&bars, &mut script.clone()).unwrap();
        assert_eq!(report.trades, expected.trades);
        assert!((report.final_capital - expected.final_capital).abs() < 1e-9);
    }

    #[test]
    fn snapshot_survives_json_with_open_position() {
        // Fees and slippage give fills with full-precision mantissas.
        let config = SimulatorConfig {
            warmup_bars: 1,
            ..SimulatorConfig::default()
        };
        let bars = candles(&[100.37, 101.13, 99.71, 100.93, 102.41, 101.07, 100.59]);
        let script = ScriptedStrategy::new()
            .at(1, SignalKind::Buy)
            .at(3, SignalKind::Close)
            .at(4, SignalKind::Sell)
            .at(6, SignalKind::Close);

        let mut straight = sim(config.clone());
        let expected = straight.run(&bars, &mut script.clone()).unwrap();

        let mut first = sim(config.clone());
        assert!(first.run(&bars, &mut script.clone().failing_at(5)).is_err());
        let snapshot = first.snapshot();
        assert!(snapshot.open_position.is_some());

        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: SimulationSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.capital.to_bits(), snapshot.capital.to_bits());
        assert_eq!(decoded.trades, snapshot.trades);
        assert_eq!(decoded.open_position, snapshot.open_position);

        let mut resumed = sim(config);
        resumed.restore(decoded);
        let report = resumed.run(&bars, &mut script.clone()).unwrap();
        assert_eq!(report.trades, expected.trades);
        assert_eq!(report.final_capital.to_bits(), expected.final_capital.to_bits());
        assert_eq!(report.equity_curve, expected.equity_curve);
    }
}
