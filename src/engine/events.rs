use crate::portfolio::{TradeReason, TradeRejection};
use crate::risk::HaltReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//structured events emitted by the engine while a run progresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    PositionOpened {
        bar: usize,
        timestamp: DateTime<Utc>,
        price: f64,
        size: f64,
        amount: f64,
        commission: f64,
    },
    PositionClosed {
        bar: usize,
        timestamp: DateTime<Utc>,
        price: f64,
        size: f64,
        profit_pct: f64,
        profit_usd: f64,
        reason: TradeReason,
    },
    TradeSkipped {
        bar: usize,
        timestamp: DateTime<Utc>,
        rejection: TradeRejection,
    },
    Halted {
        bar: usize,
        timestamp: DateTime<Utc>,
        reason: HaltReason,
    },
    RunCancelled {
        bar: usize,
    },
}

//destination for engine events, owned by the caller
pub trait EventSink: Send {
    fn on_event(&mut self, event: &EngineEvent);
}

//forwards events to the tracing facade
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::PositionOpened {
                bar,
                price,
                size,
                amount,
                commission,
                ..
            } => tracing::info!(bar, price, size, amount, commission, "position opened"),
            EngineEvent::PositionClosed {
                bar,
                price,
                profit_pct,
                profit_usd,
                reason,
                ..
            } => tracing::info!(
                bar,
                price,
                profit_pct,
                profit_usd,
                reason = %reason,
                "position closed"
            ),
            EngineEvent::TradeSkipped { bar, rejection, .. } => {
                tracing::debug!(bar, rejection = %rejection, "trade skipped")
            }
            EngineEvent::Halted { bar, reason, .. } => {
                tracing::warn!(bar, reason = %reason, "trading halted")
            }
            EngineEvent::RunCancelled { bar } => tracing::warn!(bar, "run cancelled"),
        }
    }
}

//keeps every event in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<EngineEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    pub fn halts(&self) -> impl Iterator<Item = &EngineEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, EngineEvent::Halted { .. }))
    }
}

impl EventSink for RecordingSink {
    fn on_event(&mut self, event: &EngineEvent) {
        self.events.push(event.clone());
    }
}

//discards everything, used by parameter sweeps
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&mut self, _event: &EngineEvent) {}
}
