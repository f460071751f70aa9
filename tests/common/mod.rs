#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use indexmap::IndexMap;
use sigma_backtest::data::{from_closes, Bar};
use sigma_backtest::strategy::{Signal, Strategy};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

//hourly flat bars from a close series
pub fn hourly(closes: &[f64]) -> Vec<Bar> {
    from_closes(closes, start(), Duration::hours(1))
}

//flat at 100, one upward cross at bar 10, one downward cross at bar 50
pub fn single_crossover_prices() -> Vec<f64> {
    (0..100)
        .map(|i| match i {
            0..=9 => 100.0,
            10..=49 => 110.0 + (i - 10) as f64,
            _ => 140.0 - (i - 50) as f64,
        })
        .collect()
}

//replays a fixed signal series, padding with HOLD
pub struct ScriptedStrategy {
    signals: Vec<Signal>,
}

impl ScriptedStrategy {
    pub fn new(len: usize, at: &[(usize, Signal)]) -> Self {
        let mut signals = vec![Signal::Hold; len];
        for &(i, signal) in at {
            signals[i] = signal;
        }
        ScriptedStrategy { signals }
    }

    //buy on even bars, sell on odd bars, for `round_trips` cycles
    pub fn alternating(round_trips: usize) -> Self {
        let signals = (0..round_trips * 2)
            .map(|i| if i % 2 == 0 { Signal::Buy } else { Signal::Sell })
            .collect();
        ScriptedStrategy { signals }
    }

    pub fn with_signal(mut self, index: usize, signal: Signal) -> Self {
        if index >= self.signals.len() {
            self.signals.resize(index + 1, Signal::Hold);
        }
        self.signals[index] = signal;
        self
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn parameters(&self) -> IndexMap<String, f64> {
        IndexMap::new()
    }

    fn warmup_period(&self) -> usize {
        0
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal> {
        (0..bars.len())
            .map(|i| self.signals.get(i).copied().unwrap_or_default())
            .collect()
    }
}
