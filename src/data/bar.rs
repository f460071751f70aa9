use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BarError {
    #[error("Invalid OHLC values: high ({high}) < low ({low})")]
    InvalidHighLow { high: f64, low: f64 },
    #[error("Invalid OHLC values: close ({close}) outside high-low range [{low}, {high}]")]
    InvalidClose { close: f64, high: f64, low: f64 },
    #[error("Invalid OHLC values: open ({open}) outside high-low range [{low}, {high}]")]
    InvalidOpen { open: f64, high: f64, low: f64 },
    #[error("Non-positive close price: {0}")]
    NonPositiveClose(f64),
    #[error("Non-finite value in bar at {0}")]
    NonFinite(DateTime<Utc>),
    #[error("Negative volume: {0}")]
    NegativeVolume(f64),
    #[error("Timestamp {current} at index {index} is not after previous timestamp {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

//represents a single ohlcv bar (candlestick) of market data
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    //creates a new Bar with validation
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, BarError> {
        let bar = Bar::new_unchecked(timestamp, open, high, low, close, volume);
        bar.validate()?;
        Ok(bar)
    }

    //creates a Bar without validation
    pub fn new_unchecked(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    //flat bar where every price equals the close
    pub fn flat(timestamp: DateTime<Utc>, close: f64, volume: f64) -> Self {
        Bar::new_unchecked(timestamp, close, close, close, close, volume)
    }

    //checks the ohlcv relationships of a single bar
    pub fn validate(&self) -> Result<(), BarError> {
        let values = [self.open, self.high, self.low, self.close, self.volume];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(BarError::NonFinite(self.timestamp));
        }

        if self.high < self.low {
            return Err(BarError::InvalidHighLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(BarError::InvalidClose {
                close: self.close,
                high: self.high,
                low: self.low,
            });
        }

        if self.open < self.low || self.open > self.high {
            return Err(BarError::InvalidOpen {
                open: self.open,
                high: self.high,
                low: self.low,
            });
        }

        if self.close <= 0.0 {
            return Err(BarError::NonPositiveClose(self.close));
        }

        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume(self.volume));
        }

        Ok(())
    }
}

//validates every bar and checks timestamps are strictly increasing
pub fn validate_series(bars: &[Bar]) -> Result<(), BarError> {
    for (index, bar) in bars.iter().enumerate() {
        bar.validate()?;

        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(BarError::NonIncreasingTimestamp {
                    index,
                    previous,
                    current: bar.timestamp,
                });
            }
        }
    }

    Ok(())
}

//extracts close prices in bar order
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|bar| bar.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    #[test]
    fn rejects_inverted_high_low() {
        let err = Bar::new(ts(0), 10.0, 9.0, 11.0, 10.0, 1.0).unwrap_err();
        assert!(matches!(err, BarError::InvalidHighLow { .. }));
    }

    #[test]
    fn rejects_close_outside_range() {
        let err = Bar::new(ts(0), 10.0, 11.0, 9.0, 12.0, 1.0).unwrap_err();
        assert!(matches!(err, BarError::InvalidClose { .. }));
    }

    #[test]
    fn rejects_nan_prices() {
        let err = Bar::new(ts(0), f64::NAN, 11.0, 9.0, 10.0, 1.0).unwrap_err();
        assert!(matches!(err, BarError::NonFinite(_)));
    }

    #[test]
    fn series_requires_strictly_increasing_timestamps() {
        let bars = vec![
            Bar::flat(ts(0), 10.0, 1.0),
            Bar::flat(ts(1), 10.5, 1.0),
            Bar::flat(ts(1), 10.7, 1.0),
        ];

        let err = validate_series(&bars).unwrap_err();
        assert!(matches!(
            err,
            BarError::NonIncreasingTimestamp { index: 2, .. }
        ));
    }

    #[test]
    fn irregular_spacing_is_accepted() {
        let bars = vec![
            Bar::flat(ts(0), 10.0, 1.0),
            Bar::flat(ts(1), 10.5, 1.0),
            Bar::flat(ts(7), 10.7, 1.0),
        ];

        assert!(validate_series(&bars).is_ok());
    }
}
