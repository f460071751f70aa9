pub mod sma_crossover;
pub mod sma_rsi_combo;

use crate::data::Bar;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("{name} period must be at least 1")]
    ZeroPeriod { name: &'static str },
    #[error("RSI thresholds must satisfy 0 <= oversold ({oversold}) < overbought ({overbought}) <= 100")]
    InvalidThresholds { oversold: f64, overbought: f64 },
}

//per-bar decision produced by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

//strategy interface that all strategies must implement
//
//`generate_signals` returns one signal per input bar, and the signal at
//index `i` may only depend on `bars[..=i]`, so calling it on a prefix gives
//the same signals as calling it on the full series
pub trait Strategy: Send + Sync {
    //returns the strategy name
    fn name(&self) -> &str;

    //parameters for reporting, in a stable order
    fn parameters(&self) -> IndexMap<String, f64>;

    //number of leading bars that are always HOLD
    fn warmup_period(&self) -> usize;

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal>;
}

//fast/slow moving-average spread per bar, undefined during warm-up
pub(crate) fn ma_spread(closes: &[f64], fast: usize, slow: usize) -> Vec<Option<f64>> {
    let fast_ma = crate::indicators::sma(closes, fast);
    let slow_ma = crate::indicators::sma(closes, slow);

    fast_ma
        .iter()
        .zip(slow_ma.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect()
}

//keeps slow above fast, falling back to fast + 10
pub(crate) fn normalize_periods(fast: usize, slow: usize) -> (usize, usize) {
    if slow <= fast {
        tracing::warn!(fast, slow, adjusted = fast + 10, "slow period must exceed fast period");
        (fast, fast + 10)
    } else {
        (fast, slow)
    }
}
