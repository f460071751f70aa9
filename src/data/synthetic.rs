use crate::data::bar::Bar;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

//parameters for a seeded random walk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomWalkParams {
    pub bars: usize,
    pub start_price: f64,
    //mean per-bar log return
    pub drift: f64,
    //per-bar return amplitude
    pub volatility: f64,
    pub seed: u64,
    pub start: DateTime<Utc>,
    pub step_minutes: i64,
}

impl Default for RandomWalkParams {
    fn default() -> Self {
        RandomWalkParams {
            bars: 24 * 30,
            start_price: 0.45,
            drift: 0.0001,
            volatility: 0.01,
            seed: 42,
            start: Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            step_minutes: 60,
        }
    }
}

//builds flat bars (open = high = low = close) from a close series
pub fn from_closes(closes: &[f64], start: DateTime<Utc>, step: Duration) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar::flat(start + step * i as i32, close, 1000.0))
        .collect()
}

//generates a seeded geometric random walk with plausible high/low wicks
pub fn random_walk(params: &RandomWalkParams) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let step = Duration::minutes(params.step_minutes.max(1));
    let mut bars = Vec::with_capacity(params.bars);
    let mut price = params.start_price.max(f64::EPSILON);

    for i in 0..params.bars {
        let open = price;
        let shock: f64 = rng.gen_range(-1.0..1.0) * params.volatility;
        let close = (open * (params.drift + shock).exp()).max(f64::EPSILON);

        let wick_up: f64 = rng.gen_range(0.0..0.5) * params.volatility;
        let wick_down: f64 = rng.gen_range(0.0..0.5) * params.volatility;
        let high = open.max(close) * (1.0 + wick_up);
        let low = (open.min(close) * (1.0 - wick_down)).max(f64::EPSILON);
        let volume = rng.gen_range(100.0..10_000.0);

        bars.push(Bar::new_unchecked(
            params.start + step * i as i32,
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bar::validate_series;

    #[test]
    fn random_walk_is_deterministic_per_seed() {
        let params = RandomWalkParams {
            bars: 200,
            ..RandomWalkParams::default()
        };

        assert_eq!(random_walk(&params), random_walk(&params));
    }

    #[test]
    fn random_walk_produces_valid_series() {
        let params = RandomWalkParams {
            bars: 500,
            volatility: 0.05,
            ..RandomWalkParams::default()
        };

        let bars = random_walk(&params);
        assert_eq!(bars.len(), 500);
        assert!(validate_series(&bars).is_ok());
    }

    #[test]
    fn from_closes_spaces_bars_evenly() {
        let start = RandomWalkParams::default().start;
        let bars = from_closes(&[1.0, 2.0, 3.0], start, Duration::hours(1));

        assert_eq!(bars[2].timestamp - bars[0].timestamp, Duration::hours(2));
        assert_eq!(bars[1].close, 2.0);
    }
}
