use crate::data::{closes, Bar};
use crate::indicators::rsi;
use crate::strategy::{ma_spread, normalize_periods, Signal, Strategy, StrategyError};
use indexmap::IndexMap;

//sma trend state with an rsi filter
//buys when the fast sma turns above the slow sma and rsi is not overbought
//sells when the fast sma turns below the slow sma and rsi is not oversold
//signals are edge-triggered: they only fire on the bar the trend state changes
#[derive(Debug, Clone)]
pub struct SmaRsiComboStrategy {
    name: String,
    fast_window: usize,
    slow_window: usize,
    rsi_period: usize,
    overbought: f64,
    oversold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Up,
    Down,
    Flat,
}

impl SmaRsiComboStrategy {
    pub fn new(
        fast_window: usize,
        slow_window: usize,
        rsi_period: usize,
        overbought: f64,
        oversold: f64,
    ) -> Result<Self, StrategyError> {
        if fast_window == 0 {
            return Err(StrategyError::ZeroPeriod { name: "fast" });
        }
        if slow_window == 0 {
            return Err(StrategyError::ZeroPeriod { name: "slow" });
        }
        if rsi_period == 0 {
            return Err(StrategyError::ZeroPeriod { name: "rsi" });
        }
        if !(0.0..=100.0).contains(&oversold)
            || !(0.0..=100.0).contains(&overbought)
            || oversold >= overbought
        {
            return Err(StrategyError::InvalidThresholds {
                oversold,
                overbought,
            });
        }

        let (fast_window, slow_window) = normalize_periods(fast_window, slow_window);

        Ok(SmaRsiComboStrategy {
            name: format!("SMA{}_{}_RSI{}", fast_window, slow_window, rsi_period),
            fast_window,
            slow_window,
            rsi_period,
            overbought,
            oversold,
        })
    }

    //defaults used by the combo bot: sma 50/80, rsi 14 with 65/35 bands
    pub fn with_defaults() -> Self {
        SmaRsiComboStrategy {
            name: "SMA50_80_RSI14".to_string(),
            fast_window: 50,
            slow_window: 80,
            rsi_period: 14,
            overbought: 65.0,
            oversold: 35.0,
        }
    }
}

fn trend(spread: Option<f64>) -> Trend {
    match spread {
        Some(s) if s > 0.0 => Trend::Up,
        Some(s) if s < 0.0 => Trend::Down,
        _ => Trend::Flat,
    }
}

impl Strategy for SmaRsiComboStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> IndexMap<String, f64> {
        let mut params = IndexMap::new();
        params.insert("fast_period".to_string(), self.fast_window as f64);
        params.insert("slow_period".to_string(), self.slow_window as f64);
        params.insert("rsi_period".to_string(), self.rsi_period as f64);
        params.insert("rsi_overbought".to_string(), self.overbought);
        params.insert("rsi_oversold".to_string(), self.oversold);
        params
    }

    fn warmup_period(&self) -> usize {
        self.slow_window.max(self.rsi_period)
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal> {
        let prices = closes(bars);
        let spread = ma_spread(&prices, self.fast_window, self.slow_window);
        let rsi_values = rsi(&prices, self.rsi_period);
        let warmup = self.warmup_period();

        (0..bars.len())
            .map(|i| {
                if i < warmup {
                    return Signal::Hold;
                }

                let Some(rsi_now) = rsi_values[i] else {
                    return Signal::Hold;
                };

                let current = trend(spread[i]);
                let previous = trend(spread[i - 1]);

                match current {
                    Trend::Up if previous != Trend::Up && rsi_now < self.overbought => Signal::Buy,
                    Trend::Down if previous != Trend::Down && rsi_now > self.oversold => {
                        Signal::Sell
                    }
                    _ => Signal::Hold,
                }
            })
            .collect()
    }
}
