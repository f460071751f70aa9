use crate::portfolio::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

//limits enforced by the risk guard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    //per-position stop as a fraction of entry, <= 0 disables
    pub stop_loss_fraction: f64,
    //optional per-position profit target as a fraction of entry
    pub take_profit_fraction: Option<f64>,
    //halt once the worst drawdown exceeds this fraction
    pub max_drawdown_fraction: f64,
    //halt after this many losing closes in a row
    pub consecutive_loss_limit: u32,
    //halt when capital falls below this fraction of the initial capital
    pub min_capital_fraction: f64,
    //halve entry size per consecutive loss, up to three times
    pub reduce_size_after_losses: bool,
}

impl Default for RiskLimits {
    fn default() -> Self {
        RiskLimits {
            stop_loss_fraction: 0.05,
            take_profit_fraction: None,
            max_drawdown_fraction: 0.15,
            consecutive_loss_limit: 5,
            min_capital_fraction: 0.5,
            reduce_size_after_losses: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HaltReason {
    MaxDrawdown { seen: f64, limit: f64 },
    ConsecutiveLosses { count: u32, limit: u32 },
    CapitalFloor { capital: f64, floor: f64 },
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::MaxDrawdown { seen, limit } => write!(
                f,
                "Max drawdown exceeded: {:.1}% > {:.1}%",
                seen * 100.0,
                limit * 100.0
            ),
            HaltReason::ConsecutiveLosses { count, limit } => {
                write!(f, "Too many consecutive losses: {} (limit {})", count, limit)
            }
            HaltReason::CapitalFloor { capital, floor } => {
                write!(f, "Capital below floor: ${:.2} < ${:.2}", capital, floor)
            }
        }
    }
}

//trading -> halted, no way back without reset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum RiskState {
    #[default]
    Trading,
    Halted(HaltReason),
}

//snapshot of the guard for reporting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskStatus {
    pub state: RiskState,
    pub consecutive_losses: u32,
    //fraction, never decreases during a run
    pub max_drawdown_seen: f64,
    pub current_capital: f64,
    //current capital as a percentage of initial capital
    pub capital_usage: f64,
}

impl RiskStatus {
    pub fn is_halted(&self) -> bool {
        matches!(self.state, RiskState::Halted(_))
    }

    pub fn halt_reason(&self) -> Option<String> {
        match self.state {
            RiskState::Halted(reason) => Some(reason.to_string()),
            RiskState::Trading => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskGuard {
    limits: RiskLimits,
    initial_capital: f64,
    current_capital: f64,
    peak_equity: f64,
    max_drawdown_seen: f64,
    consecutive_losses: u32,
    state: RiskState,
}

impl RiskGuard {
    pub fn new(limits: RiskLimits, initial_capital: f64) -> Self {
        RiskGuard {
            limits,
            initial_capital,
            current_capital: initial_capital,
            peak_equity: initial_capital,
            max_drawdown_seen: 0.0,
            consecutive_losses: 0,
            state: RiskState::Trading,
        }
    }

    pub fn reset(&mut self) {
        *self = RiskGuard::new(self.limits, self.initial_capital);
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn max_drawdown_seen(&self) -> f64 {
        self.max_drawdown_seen
    }

    //new entries are only allowed while trading
    pub fn allows_entries(&self) -> bool {
        self.state == RiskState::Trading
    }

    //true when the open position has lost at least the stop fraction
    pub fn stop_loss_triggered(&self, position: &Position, price: f64) -> bool {
        if position.is_flat() || position.entry_price <= 0.0 || self.limits.stop_loss_fraction <= 0.0
        {
            return false;
        }
        position.return_at(price) <= -self.limits.stop_loss_fraction
    }

    //true when the open position has gained at least the profit target
    pub fn take_profit_triggered(&self, position: &Position, price: f64) -> bool {
        match self.limits.take_profit_fraction {
            Some(target) if target > 0.0 && position.is_open() && position.entry_price > 0.0 => {
                position.return_at(price) >= target
            }
            _ => false,
        }
    }

    //tracks running peak and worst drawdown from an equity observation
    pub fn observe_equity(&mut self, equity: f64) {
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }

        if self.peak_equity > 0.0 {
            let drawdown = (self.peak_equity - equity) / self.peak_equity;
            if drawdown > self.max_drawdown_seen {
                self.max_drawdown_seen = drawdown;
            }
        }
    }

    //records a closed trade and evaluates halt conditions
    //returns the halt reason if this close halted trading
    pub fn record_close(&mut self, profit_usd: f64, capital_after: f64) -> Option<HaltReason> {
        if profit_usd < 0.0 {
            self.consecutive_losses += 1;
        } else {
            self.consecutive_losses = 0;
        }

        self.current_capital = capital_after;
        self.observe_equity(capital_after);

        if !self.allows_entries() {
            return None;
        }

        let reason = self.halt_condition()?;
        self.state = RiskState::Halted(reason);
        Some(reason)
    }

    fn halt_condition(&self) -> Option<HaltReason> {
        if self.max_drawdown_seen > self.limits.max_drawdown_fraction {
            return Some(HaltReason::MaxDrawdown {
                seen: self.max_drawdown_seen,
                limit: self.limits.max_drawdown_fraction,
            });
        }

        if self.limits.consecutive_loss_limit > 0
            && self.consecutive_losses >= self.limits.consecutive_loss_limit
        {
            return Some(HaltReason::ConsecutiveLosses {
                count: self.consecutive_losses,
                limit: self.limits.consecutive_loss_limit,
            });
        }

        let floor = self.initial_capital * self.limits.min_capital_fraction;
        if self.current_capital < floor {
            return Some(HaltReason::CapitalFloor {
                capital: self.current_capital,
                floor,
            });
        }

        None
    }

    //multiplier applied to the entry size
    pub fn size_multiplier(&self) -> f64 {
        if !self.limits.reduce_size_after_losses || self.consecutive_losses == 0 {
            return 1.0;
        }
        0.5_f64.powi(self.consecutive_losses.min(3) as i32)
    }

    pub fn status(&self) -> RiskStatus {
        let capital_usage = if self.initial_capital > 0.0 {
            self.current_capital / self.initial_capital * 100.0
        } else {
            0.0
        };

        RiskStatus {
            state: self.state,
            consecutive_losses: self.consecutive_losses,
            max_drawdown_seen: self.max_drawdown_seen,
            current_capital: self.current_capital,
            capital_usage,
        }
    }
}
