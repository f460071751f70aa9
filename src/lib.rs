//bar-by-bar strategy backtesting engine for a single long-only asset

pub mod config;
pub mod data;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod optimizer;
pub mod portfolio;
pub mod risk;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        BacktestConfiguration, ComboParams, ConfigError, RunConfig, SmaParams, StrategyParams,
        StrategyType,
    };
    pub use crate::data::{
        from_closes, load_csv, random_walk, validate_series, Bar, BarError, RandomWalkParams,
    };
    pub use crate::engine::{
        BacktestEngine, BacktestResult, EngineEvent, EventSink, NullSink, RecordingSink,
        TracingSink,
    };
    pub use crate::metrics::{EquityPoint, PerformanceMetrics};
    pub use crate::optimizer::{Objective, ParameterSweep, RsiFilter, SweepGrid, SweepReport};
    pub use crate::portfolio::{Account, Position, SizingMode, TradeReason, TradeRecord, TradeSide};
    pub use crate::risk::{HaltReason, RiskGuard, RiskLimits, RiskState, RiskStatus};
    pub use crate::strategy::{
        sma_crossover::SmaCrossoverStrategy, sma_rsi_combo::SmaRsiComboStrategy, Signal, Strategy,
        StrategyError,
    };
}
