use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//trade side (buy opens, sell closes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

//why a trade happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeReason {
    Entry,
    Signal,
    StopLoss,
    TakeProfit,
    EndOfRun,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

impl fmt::Display for TradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TradeReason::Entry => "ENTRY",
            TradeReason::Signal => "SIGNAL",
            TradeReason::StopLoss => "STOP_LOSS",
            TradeReason::TakeProfit => "TAKE_PROFIT",
            TradeReason::EndOfRun => "END_OF_RUN",
        };
        f.write_str(label)
    }
}

//immutable ledger entry, one per executed buy or sell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub side: TradeSide,
    pub price: f64,
    pub size: f64,
    //cash moved by the trade: spent on a buy, received on a sell
    pub amount: f64,
    pub commission: f64,
    //only set on sells
    pub profit_pct: Option<f64>,
    pub profit_usd: Option<f64>,
    pub reason: TradeReason,
}

impl TradeRecord {
    pub fn is_close(&self) -> bool {
        self.side == TradeSide::Sell
    }

    //true for a sell that made money
    pub fn is_win(&self) -> bool {
        self.profit_usd.map(|p| p > 0.0).unwrap_or(false)
    }
}
