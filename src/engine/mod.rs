pub mod backtest;
pub mod events;

pub use backtest::{BacktestEngine, BacktestResult};
pub use events::{EngineEvent, EventSink, NullSink, RecordingSink, TracingSink};
