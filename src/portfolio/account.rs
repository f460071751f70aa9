use crate::portfolio::position::Position;
use crate::portfolio::trade::{TradeReason, TradeRecord, TradeSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//expected steady-state outcomes when a transition cannot happen
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TradeRejection {
    #[error("trade too small: ${notional:.4} < ${minimum} minimum")]
    TooSmall { notional: f64, minimum: f64 },
    #[error("already in a position")]
    AlreadyInPosition,
    #[error("no open position to sell")]
    NoPosition,
    #[error("invalid trade price: {0}")]
    InvalidPrice(f64),
    #[error("invalid sizing fraction: {0}")]
    InvalidFraction(f64),
}

//how entries are sized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizingMode {
    //fraction of current cash, profits are reinvested
    Compounding,
    //fraction of initial capital on every entry
    Fixed,
}

//represents a trading account with cash and one long-only position
#[derive(Debug, Clone)]
pub struct Account {
    //initial account balance
    pub initial_capital: f64,

    //free cash after commissions
    pub cash: f64,

    pub position: Position,

    //complete trade log
    pub trade_log: Vec<TradeRecord>,

    //fraction of notional deducted per trade
    pub commission_rate: f64,

    //smallest notional accepted for an entry
    pub min_trade_size: f64,

    pub sizing: SizingMode,
}

impl Account {
    //creates a new account with initial balance
    pub fn new(
        initial_capital: f64,
        commission_rate: f64,
        min_trade_size: f64,
        sizing: SizingMode,
    ) -> Self {
        Account {
            initial_capital,
            cash: initial_capital,
            position: Position::flat(),
            trade_log: Vec::new(),
            commission_rate,
            min_trade_size,
            sizing,
        }
    }

    //flattens the position, restores cash and clears the ledger
    pub fn reset(&mut self) {
        self.cash = self.initial_capital;
        self.position = Position::flat();
        self.trade_log.clear();
    }

    //cash plus mark-to-market value of the open position
    pub fn equity(&self, current_price: f64) -> f64 {
        self.cash + self.position.market_value(current_price)
    }

    //capital the sizing fraction applies to
    pub fn sizing_base(&self) -> f64 {
        match self.sizing {
            SizingMode::Compounding => self.cash,
            SizingMode::Fixed => self.initial_capital,
        }
    }

    //opens a position with `sizing_fraction` of the sizing base
    //the spend is capped at available cash
    pub fn buy(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        sizing_fraction: f64,
    ) -> Result<&TradeRecord, TradeRejection> {
        if self.position.is_open() {
            return Err(TradeRejection::AlreadyInPosition);
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(TradeRejection::InvalidPrice(price));
        }
        if !sizing_fraction.is_finite() || sizing_fraction <= 0.0 {
            return Err(TradeRejection::InvalidFraction(sizing_fraction));
        }

        let trade_amount = (self.sizing_base() * sizing_fraction).min(self.cash).max(0.0);
        let commission = trade_amount * self.commission_rate;
        let size = (trade_amount - commission) / price;
        let notional = size * price;

        if notional <= 0.0 || notional < self.min_trade_size {
            return Err(TradeRejection::TooSmall {
                notional,
                minimum: self.min_trade_size,
            });
        }

        self.cash -= trade_amount;
        self.position.open(size, price, timestamp);

        self.trade_log.push(TradeRecord {
            timestamp,
            side: TradeSide::Buy,
            price,
            size,
            amount: trade_amount,
            commission,
            profit_pct: None,
            profit_usd: None,
            reason: TradeReason::Entry,
        });

        Ok(self.last_trade())
    }

    //closes the open position at `price`
    //commission never blocks an exit
    pub fn sell(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        reason: TradeReason,
    ) -> Result<&TradeRecord, TradeRejection> {
        if self.position.is_flat() {
            return Err(TradeRejection::NoPosition);
        }
        if !price.is_finite() || price < 0.0 {
            return Err(TradeRejection::InvalidPrice(price));
        }

        let size = self.position.size;
        let entry_price = self.position.entry_price;

        let gross = size * price;
        let commission = gross * self.commission_rate;
        let revenue = gross - commission;
        let profit_pct = (price / entry_price - 1.0) * 100.0;
        let profit_usd = (price - entry_price) * size;

        self.cash += revenue;
        self.position.close();

        self.trade_log.push(TradeRecord {
            timestamp,
            side: TradeSide::Sell,
            price,
            size,
            amount: revenue,
            commission,
            profit_pct: Some(profit_pct),
            profit_usd: Some(profit_usd),
            reason,
        });

        Ok(self.last_trade())
    }

    fn last_trade(&self) -> &TradeRecord {
        //only called right after a push
        &self.trade_log[self.trade_log.len() - 1]
    }

    //returns total realized pnl across closed trades
    pub fn total_realized_pnl(&self) -> f64 {
        self.trade_log.iter().filter_map(|t| t.profit_usd).sum()
    }

    //returns total commission paid
    pub fn total_commission(&self) -> f64 {
        self.trade_log.iter().map(|t| t.commission).sum()
    }
}
