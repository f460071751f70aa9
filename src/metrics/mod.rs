pub mod float_repr;
pub mod summary;
pub mod timeseries;

pub use summary::PerformanceMetrics;
pub use timeseries::{
    calculate_returns, drawdown_series, max_drawdown_pct, running_max_drawdown, EquityPoint,
};
