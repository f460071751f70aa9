use crate::portfolio::SizingMode;
use crate::risk::RiskLimits;
use crate::strategy::sma_crossover::SmaCrossoverStrategy;
use crate::strategy::sma_rsi_combo::SmaRsiComboStrategy;
use crate::strategy::{Strategy, StrategyError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("initial capital must be positive, got {0}")]
    NonPositiveCapital(f64),
    #[error("commission rate must be in [0, 1), got {0}")]
    InvalidCommission(f64),
    #[error("position size fraction must be positive, got {0}")]
    InvalidPositionSize(f64),
    #[error("max drawdown fraction must be positive, got {0}")]
    InvalidDrawdownLimit(f64),
    #[error("annualization factor must be positive, got {0}")]
    InvalidAnnualization(f64),
}

//strategy type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyType {
    SmaCrossover,
    SmaRsiCombo,
}

impl StrategyType {
    //parse strategy type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sma" | "sma_crossover" | "crossover" => Some(StrategyType::SmaCrossover),
            "combo" | "sma_rsi" | "sma_rsi_combo" => Some(StrategyType::SmaRsiCombo),
            _ => None,
        }
    }
}

//sma crossover strategy parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmaParams {
    pub fast_window: usize,
    pub slow_window: usize,
}

impl Default for SmaParams {
    fn default() -> Self {
        SmaParams {
            fast_window: 20,
            slow_window: 45,
        }
    }
}

//sma + rsi filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboParams {
    pub fast_window: usize,
    pub slow_window: usize,
    pub rsi_period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for ComboParams {
    fn default() -> Self {
        ComboParams {
            fast_window: 50,
            slow_window: 80,
            rsi_period: 14,
            overbought: 65.0,
            oversold: 35.0,
        }
    }
}

//strategy-specific parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyParams {
    Crossover(SmaParams),
    ComboFilter(ComboParams),
}

impl StrategyParams {
    pub fn strategy_type(&self) -> StrategyType {
        match self {
            StrategyParams::Crossover(_) => StrategyType::SmaCrossover,
            StrategyParams::ComboFilter(_) => StrategyType::SmaRsiCombo,
        }
    }

    //instantiates a fresh strategy
    pub fn build(&self) -> Result<Box<dyn Strategy>, StrategyError> {
        Ok(match self {
            StrategyParams::Crossover(p) => {
                Box::new(SmaCrossoverStrategy::new(p.fast_window, p.slow_window)?)
            }
            StrategyParams::ComboFilter(p) => Box::new(SmaRsiComboStrategy::new(
                p.fast_window,
                p.slow_window,
                p.rsi_period,
                p.overbought,
                p.oversold,
            )?),
        })
    }

    //short label used by sweep reports
    pub fn label(&self) -> String {
        match self {
            StrategyParams::Crossover(p) => format!("SMA({}/{})", p.fast_window, p.slow_window),
            StrategyParams::ComboFilter(p) => format!(
                "SMA({}/{})+RSI({} {}/{})",
                p.fast_window, p.slow_window, p.rsi_period, p.overbought, p.oversold
            ),
        }
    }
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams::Crossover(SmaParams::default())
    }
}

//options for a single simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub initial_capital: f64,
    //fraction of notional deducted per trade
    pub commission_rate: f64,
    //per-position stop, <= 0 disables
    pub stop_loss_fraction: f64,
    pub take_profit_fraction: Option<f64>,
    pub max_drawdown_fraction: f64,
    pub consecutive_loss_limit: u32,
    pub min_capital_fraction: f64,
    //reinvest profits by sizing from current cash
    pub compounding: bool,
    pub min_trade_size: f64,
    pub position_size_fraction: f64,
    pub reduce_size_after_losses: bool,
    //periods per year for sharpe/sortino, 8760 for hourly bars
    pub annualization_factor: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            initial_capital: 1000.0,
            commission_rate: 0.001,
            stop_loss_fraction: 0.05,
            take_profit_fraction: None,
            max_drawdown_fraction: 0.15,
            consecutive_loss_limit: 5,
            min_capital_fraction: 0.5,
            compounding: true,
            min_trade_size: 0.5,
            position_size_fraction: 0.95,
            reduce_size_after_losses: false,
            annualization_factor: 365.0 * 24.0,
        }
    }
}

impl RunConfig {
    //rejects values that have no safe default
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(self.initial_capital));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(ConfigError::InvalidCommission(self.commission_rate));
        }
        if !self.position_size_fraction.is_finite() || self.position_size_fraction <= 0.0 {
            return Err(ConfigError::InvalidPositionSize(self.position_size_fraction));
        }
        if !self.max_drawdown_fraction.is_finite() || self.max_drawdown_fraction <= 0.0 {
            return Err(ConfigError::InvalidDrawdownLimit(self.max_drawdown_fraction));
        }
        if !self.annualization_factor.is_finite() || self.annualization_factor <= 0.0 {
            return Err(ConfigError::InvalidAnnualization(self.annualization_factor));
        }
        Ok(())
    }

    //corrects values that have a safe default
    pub fn normalized(mut self) -> Self {
        if self.position_size_fraction > 1.0 {
            tracing::warn!(
                position_size_fraction = self.position_size_fraction,
                "position size cannot exceed 100%, using 95%"
            );
            self.position_size_fraction = 0.95;
        }
        if self.min_trade_size < 0.0 || !self.min_trade_size.is_finite() {
            tracing::warn!(min_trade_size = self.min_trade_size, "invalid minimum trade size, using 0");
            self.min_trade_size = 0.0;
        }
        if let Some(target) = self.take_profit_fraction {
            if target <= 0.0 || !target.is_finite() {
                tracing::warn!(take_profit_fraction = target, "ignoring non-positive take profit");
                self.take_profit_fraction = None;
            }
        }
        self
    }

    pub fn sizing_mode(&self) -> SizingMode {
        if self.compounding {
            SizingMode::Compounding
        } else {
            SizingMode::Fixed
        }
    }

    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            stop_loss_fraction: self.stop_loss_fraction,
            take_profit_fraction: self.take_profit_fraction,
            max_drawdown_fraction: self.max_drawdown_fraction,
            consecutive_loss_limit: self.consecutive_loss_limit,
            min_capital_fraction: self.min_capital_fraction,
            reduce_size_after_losses: self.reduce_size_after_losses,
        }
    }
}

//complete backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfiguration {
    //data
    pub data_path: Option<PathBuf>,

    //account and risk settings
    #[serde(default)]
    pub run: RunConfig,

    //strategy
    #[serde(default)]
    pub strategy: StrategyParams,

    //optional output paths
    #[serde(default)]
    pub output_equity_csv: Option<PathBuf>,
    #[serde(default)]
    pub output_trades_csv: Option<PathBuf>,
}

impl Default for BacktestConfiguration {
    fn default() -> Self {
        BacktestConfiguration {
            data_path: None,
            run: RunConfig::default(),
            strategy: StrategyParams::default(),
            output_equity_csv: None,
            output_trades_csv: None,
        }
    }
}

impl BacktestConfiguration {
    //load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BacktestConfiguration = serde_json::from_str(&contents)?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
