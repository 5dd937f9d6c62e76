//! Serializable run configuration, loaded from TOML.
//!
//! ```toml
//! [simulation]
//! initial_capital = 10000.0
//! leverage = 2.0
//!
//! [risk]
//! max_position_fraction = 0.25
//!
//! [risk.adaptive]
//! daily_risk_fraction = 0.02
//!
//! [strategy]
//! type = "MA_CROSSOVER"
//! fast = 10
//! slow = 30
//!
//! [monte_carlo]
//! iterations = 1000
//! seed = 42
//!
//! [walk_forward]
//! train_days = 60
//! test_days = 20
//! step_days = 20
//! ```
//!
//! Every section is optional; missing fields take their defaults.

use std::path::{Path, PathBuf};

use risklab_core::domain::SignalKind;
use risklab_core::engine::{ConfigError as SimulatorConfigError, SimulatorConfig};
use risklab_core::risk::RiskLimits;
use risklab_core::strategy::{MaCrossover, ScriptedStrategy, Strategy, StrategyError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monte_carlo::MonteCarloConfig;
use crate::walk_forward::WalkForwardConfig;

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid [simulation]: {0}")]
    Simulation(#[from] SimulatorConfigError),

    #[error("invalid [{section}]: {message}")]
    Invalid {
        section: &'static str,
        message: String,
    },
}

fn invalid(section: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        section,
        message: message.into(),
    }
}

/// One scheduled signal of a scripted strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedSignal {
    pub bar: usize,
    pub kind: SignalKind,
}

/// Strategy configuration (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    /// Fast SMA crosses slow SMA.
    MaCrossover {
        fast: usize,
        slow: usize,
        #[serde(default)]
        allow_short: bool,
    },

    /// Replay of fixed signals by bar index.
    Scripted { signals: Vec<ScriptedSignal> },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::MaCrossover {
            fast: 10,
            slow: 30,
            allow_short: false,
        }
    }
}

impl StrategyConfig {
    /// A fresh strategy instance. Each simulation run gets its own.
    pub fn build(&self) -> Result<Box<dyn Strategy>, StrategyError> {
        match self {
            StrategyConfig::MaCrossover {
                fast,
                slow,
                allow_short,
            } => Ok(Box::new(MaCrossover::new(*fast, *slow, *allow_short)?)),
            StrategyConfig::Scripted { signals } => Ok(Box::new(
                signals
                    .iter()
                    .fold(ScriptedStrategy::new(), |s, sig| s.at(sig.bar, sig.kind)),
            )),
        }
    }
}

/// Complete configuration for `run`, `monte-carlo` and `walk-forward`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub simulation: SimulatorConfig,
    pub risk: RiskLimits,
    pub strategy: StrategyConfig,
    pub monte_carlo: MonteCarloConfig,
    pub walk_forward: WalkForwardConfig,
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share the same RunId, so artifacts
    /// can be traced back to the exact settings that produced them.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.validate_risk()?;

        match &self.strategy {
            StrategyConfig::MaCrossover { fast, slow, .. } if *fast == 0 || fast >= slow => {
                return Err(invalid(
                    "strategy",
                    format!("need 0 < fast < slow, got fast={fast} slow={slow}"),
                ));
            }
            _ => {}
        }

        if self.monte_carlo.iterations == 0 {
            return Err(invalid("monte_carlo", "iterations must be > 0"));
        }
        if !self.monte_carlo.ruin_threshold_pct.is_finite() {
            return Err(invalid("monte_carlo", "ruin_threshold_pct must be finite"));
        }

        let wf = &self.walk_forward;
        if wf.train_days == 0 || wf.test_days == 0 || wf.step_days == 0 {
            return Err(invalid(
                "walk_forward",
                "train_days, test_days and step_days must be > 0",
            ));
        }
        Ok(())
    }

    fn validate_risk(&self) -> Result<(), ConfigError> {
        let r = &self.risk;
        let positive = |v: f64| v.is_finite() && v > 0.0;

        if !positive(r.max_position_fraction) {
            return Err(invalid("risk", "max_position_fraction must be > 0"));
        }
        if !(r.max_leverage.is_finite() && r.max_leverage >= 1.0) {
            return Err(invalid("risk", "max_leverage must be >= 1"));
        }
        if !(positive(r.max_daily_drawdown) && r.max_daily_drawdown < 1.0) {
            return Err(invalid("risk", "max_daily_drawdown must be in (0, 1)"));
        }
        if !(positive(r.margin_warn_ratio) && r.margin_warn_ratio <= r.margin_reject_ratio) {
            return Err(invalid(
                "risk",
                "margin ratios need 0 < margin_warn_ratio <= margin_reject_ratio",
            ));
        }
        if r.critical_margin_level > r.min_margin_level {
            return Err(invalid(
                "risk",
                "critical_margin_level must not exceed min_margin_level",
            ));
        }
        if let Some(pct) = r.stop_loss_pct {
            if !(positive(pct) && pct < 1.0) {
                return Err(invalid("risk", "stop_loss_pct must be in (0, 1)"));
            }
        }

        if let Some(a) = &r.adaptive {
            if !(positive(a.high_volatility_threshold)
                && a.high_volatility_threshold < a.extreme_volatility_threshold)
            {
                return Err(invalid(
                    "risk.adaptive",
                    "need 0 < high_volatility_threshold < extreme_volatility_threshold",
                ));
            }
            if !(positive(a.drawdown_reduce_threshold)
                && a.drawdown_reduce_threshold < a.drawdown_block_threshold
                && a.drawdown_block_threshold <= a.drawdown_emergency_threshold)
            {
                return Err(invalid(
                    "risk.adaptive",
                    "need 0 < reduce < block <= emergency drawdown thresholds",
                ));
            }
            if !positive(a.daily_risk_fraction) {
                return Err(invalid("risk.adaptive", "daily_risk_fraction must be > 0"));
            }
        }
        Ok(())
    }
}
