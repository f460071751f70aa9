use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//a point in the equity curve, recorded once per bar before the bar is acted on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    pub price: f64,
}

impl EquityPoint {
    pub fn new(timestamp: DateTime<Utc>, equity: f64, price: f64) -> Self {
        EquityPoint {
            timestamp,
            equity,
            price,
        }
    }
}

//drawdown from the running peak at each point, as a fraction
pub fn drawdown_series(equity_values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_values
        .iter()
        .map(|&equity| {
            if equity > peak {
                peak = equity;
            }
            if peak > 0.0 {
                (peak - equity) / peak
            } else {
                0.0
            }
        })
        .collect()
}

//worst drawdown seen so far at each point, non-decreasing
pub fn running_max_drawdown(equity_values: &[f64]) -> Vec<f64> {
    let mut worst = 0.0_f64;
    drawdown_series(equity_values)
        .into_iter()
        .map(|dd| {
            worst = worst.max(dd);
            worst
        })
        .collect()
}

//maximum drawdown as a percentage
pub fn max_drawdown_pct(equity_values: &[f64]) -> f64 {
    drawdown_series(equity_values)
        .into_iter()
        .fold(0.0, f64::max)
        * 100.0
}

//calculates returns from equity values
pub fn calculate_returns(equity_values: &[f64]) -> Vec<f64> {
    equity_values
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

//percentile with linear interpolation between closest ranks, q in [0, 100]
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

//historical value at risk: the return at the (1 - confidence) percentile
pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    percentile(returns, (1.0 - confidence) * 100.0).unwrap_or(0.0)
}

//mean of the returns at or below the value at risk
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    let var = value_at_risk(returns, confidence);
    let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= var).collect();
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}
