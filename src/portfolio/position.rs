use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//single long-only spot position
//invariant: size > 0 exactly when entry_price > 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    //quantity held (0 when flat)
    pub size: f64,

    //entry price (0 when flat)
    pub entry_price: f64,

    //when the position was opened
    pub opened_at: Option<DateTime<Utc>>,
}

impl Position {
    //creates a new flat position
    pub fn flat() -> Self {
        Position::default()
    }

    //returns true if the position is flat (no open position)
    pub fn is_flat(&self) -> bool {
        self.size == 0.0
    }

    pub fn is_open(&self) -> bool {
        !self.is_flat()
    }

    //fractional move since entry, eg -0.05 for a 5% loss
    pub fn return_at(&self, current_price: f64) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        current_price / self.entry_price - 1.0
    }

    //calculates unrealized pnl at a given price
    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        (current_price - self.entry_price) * self.size
    }

    //mark-to-market value of the holding
    pub fn market_value(&self, current_price: f64) -> f64 {
        self.size * current_price
    }

    pub(crate) fn open(&mut self, size: f64, entry_price: f64, at: DateTime<Utc>) {
        self.size = size;
        self.entry_price = entry_price;
        self.opened_at = Some(at);
    }

    pub(crate) fn close(&mut self) {
        *self = Position::flat();
    }
}
