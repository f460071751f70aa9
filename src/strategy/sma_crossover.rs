use crate::data::{closes, Bar};
use crate::strategy::{ma_spread, normalize_periods, Signal, Strategy, StrategyError};
use indexmap::IndexMap;

//sma crossover strategy
//buys when the fast sma crosses above the slow sma
//sells when the fast sma crosses below the slow sma
#[derive(Debug, Clone)]
pub struct SmaCrossoverStrategy {
    name: String,
    fast_window: usize,
    slow_window: usize,
}

impl SmaCrossoverStrategy {
    pub fn new(fast_window: usize, slow_window: usize) -> Result<Self, StrategyError> {
        if fast_window == 0 {
            return Err(StrategyError::ZeroPeriod { name: "fast" });
        }
        if slow_window == 0 {
            return Err(StrategyError::ZeroPeriod { name: "slow" });
        }

        let (fast_window, slow_window) = normalize_periods(fast_window, slow_window);

        Ok(SmaCrossoverStrategy {
            name: format!("SMA_Crossover_{}_{}", fast_window, slow_window),
            fast_window,
            slow_window,
        })
    }

    pub fn fast_window(&self) -> usize {
        self.fast_window
    }

    pub fn slow_window(&self) -> usize {
        self.slow_window
    }
}

//sign change of (fast - slow) between two bars
//equality counts as not yet crossed in either direction
pub(crate) fn crossover_signal(prev: f64, current: f64) -> Signal {
    if prev <= 0.0 && current > 0.0 {
        Signal::Buy
    } else if prev >= 0.0 && current < 0.0 {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

impl Strategy for SmaCrossoverStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> IndexMap<String, f64> {
        let mut params = IndexMap::new();
        params.insert("fast_period".to_string(), self.fast_window as f64);
        params.insert("slow_period".to_string(), self.slow_window as f64);
        params
    }

    fn warmup_period(&self) -> usize {
        self.slow_window
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<Signal> {
        let spread = ma_spread(&closes(bars), self.fast_window, self.slow_window);
        let warmup = self.warmup_period();

        (0..bars.len())
            .map(|i| {
                if i < warmup {
                    return Signal::Hold;
                }

                match (spread[i - 1], spread[i]) {
                    (Some(prev), Some(current)) => crossover_signal(prev, current),
                    _ => Signal::Hold,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::from_closes;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        from_closes(closes, start, Duration::hours(1))
    }

    #[test]
    fn invalid_slow_is_adjusted() {
        let strategy = SmaCrossoverStrategy::new(20, 10).unwrap();
        assert_eq!(strategy.slow_window(), 30);
        assert_eq!(strategy.name(), "SMA_Crossover_20_30");
    }

    #[test]
    fn zero_period_is_rejected() {
        assert_eq!(
            SmaCrossoverStrategy::new(0, 10).unwrap_err(),
            StrategyError::ZeroPeriod { name: "fast" }
        );
    }

    #[test]
    fn emits_buy_then_sell_on_crossings() {
        let mut closes = vec![100.0; 10];
        closes.extend((0..10).map(|i| 110.0 + i as f64));
        closes.extend((0..10).map(|i| 90.0 - i as f64));

        let strategy = SmaCrossoverStrategy::new(2, 5).unwrap();
        let signals = strategy.generate_signals(&bars(&closes));

        assert_eq!(signals.len(), closes.len());
        assert_eq!(signals[10], Signal::Buy);
        assert_eq!(signals[20], Signal::Sell);
        assert_eq!(
            signals.iter().filter(|s| **s != Signal::Hold).count(),
            2
        );
    }

    #[test]
    fn warmup_bars_are_hold() {
        let closes: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 100.0 } else { 120.0 }).collect();
        let strategy = SmaCrossoverStrategy::new(1, 8).unwrap();
        let signals = strategy.generate_signals(&bars(&closes));

        assert!(signals[..8].iter().all(|s| *s == Signal::Hold));
    }

    #[test]
    fn touching_without_crossing_does_not_fire() {
        assert_eq!(crossover_signal(-1.0, 0.0), Signal::Hold);
        assert_eq!(crossover_signal(0.0, 1.0), Signal::Buy);
        assert_eq!(crossover_signal(0.0, -1.0), Signal::Sell);
        assert_eq!(crossover_signal(1.0, 0.0), Signal::Hold);
    }

    #[test]
    fn short_series_is_all_hold() {
        let strategy = SmaCrossoverStrategy::new(2, 5).unwrap();
        let signals = strategy.generate_signals(&bars(&[1.0, 2.0, 3.0]));
        assert_eq!(signals, vec![Signal::Hold; 3]);
        assert!(strategy.generate_signals(&[]).is_empty());
    }
}
