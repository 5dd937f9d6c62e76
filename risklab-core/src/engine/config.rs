//! Simulator configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::DEFAULT_PERIODS_PER_YEAR;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        expected: &'static str,
        value: f64,
    },
    #[error("symbol must not be empty")]
    EmptySymbol,
}

/// Everything the execution simulator needs besides candles, strategy and
/// risk chain. Fee and slippage rates are fractions (0.001 = 0.1%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub symbol: String,
    pub initial_capital: f64,
    pub maker_fee: f64,
    pub taker_fee: f64,
    pub slippage_rate: f64,
    /// Share of capital committed as margin per entry.
    pub position_size_fraction: f64,
    pub leverage: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub cooldown_bars: usize,
    pub confirmation_bars: usize,
    pub min_holding_bars: usize,
    /// Bars skipped before the strategy is first consulted.
    pub warmup_bars: usize,
    /// Annualization factor for Sharpe and Sortino.
    pub periods_per_year: f64,
    /// Close-to-close returns used for the volatility fed to the risk chain.
    pub volatility_lookback: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            initial_capital: 10_000.0,
            maker_fee: 0.0002,
            taker_fee: 0.0004,
            slippage_rate: 0.0005,
            position_size_fraction: 0.10,
            leverage: 1.0,
            stop_loss_pct: 0.02,
            take_profit_pct: 0.04,
            cooldown_bars: 0,
            confirmation_bars: 0,
            min_holding_bars: 0,
            warmup_bars: 50,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            volatility_lookback: 20,
        }
    }
}

fn check(
    field: &'static str,
    value: f64,
    expected: &'static str,
    ok: impl Fn(f64) -> bool,
) -> Result<(), ConfigError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected,
            value,
        })
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        check("initial_capital", self.initial_capital, "> 0", |v| v > 0.0)?;
        check("maker_fee", self.maker_fee, "in [0, 1)", |v| (0.0..1.0).contains(&v))?;
        check("taker_fee", self.taker_fee, "in [0, 1)", |v| (0.0..1.0).contains(&v))?;
        check("slippage_rate", self.slippage_rate, "in [0, 1)", |v| {
            (0.0..1.0).contains(&v)
        })?;
        check(
            "position_size_fraction",
            self.position_size_fraction,
            "in (0, 1]",
            |v| v > 0.0 && v <= 1.0,
        )?;
        check("leverage", self.leverage, ">= 1", |v| v >= 1.0)?;
        check("stop_loss_pct", self.stop_loss_pct, "in (0, 1)", |v| {
            v > 0.0 && v < 1.0
        })?;
        check("take_profit_pct", self.take_profit_pct, "> 0", |v| v > 0.0)?;
        check("periods_per_year", self.periods_per_year, "> 0", |v| v > 0.0)?;
        if self.volatility_lookback < 2 {
            return Err(ConfigError::OutOfRange {
                field: "volatility_lookback",
                expected: ">= 2",
                value: self.volatility_lookback as f64,
            });
        }
        Ok(())
    }
}
