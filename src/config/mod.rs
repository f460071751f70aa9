pub mod backtest_config;

pub use backtest_config::{
    BacktestConfiguration, ComboParams, ConfigError, RunConfig, SmaParams, StrategyParams,
    StrategyType,
};
