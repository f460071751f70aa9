//rolling indicators over a price series
//
//every function returns a series aligned 1:1 with its input where `None`
//marks the warm-up region, so callers never compare against NaN

//simple moving average of the trailing `period` samples ending at each index
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    for (offset, window) in values.windows(period).enumerate() {
        out[offset + period - 1] = Some(window.iter().sum::<f64>() / period as f64);
    }

    out
}

//relative strength index with wilder smoothing (alpha = 1/period)
//the averages are seeded at zero on the first bar, so the series is defined
//from index period - 1 onwards, matching the sma warm-up
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let alpha = 1.0 / period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 0..values.len() {
        let change = if i == 0 { 0.0 } else { values[i] - values[i - 1] };
        avg_gain = alpha * change.max(0.0) + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * (-change).max(0.0) + (1.0 - alpha) * avg_loss;

        if i + 1 >= period {
            out[i] = Some(relative_strength(avg_gain, avg_loss));
        }
    }

    out
}

fn relative_strength(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sma_marks_warmup_as_undefined() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);

        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_relative_eq!(out[2].unwrap(), 2.0);
        assert_relative_eq!(out[3].unwrap(), 3.0);
        assert_relative_eq!(out[4].unwrap(), 4.0);
    }

    #[test]
    fn sma_with_short_input_is_all_undefined() {
        assert!(sma(&[1.0, 2.0], 3).iter().all(Option::is_none));
        assert!(sma(&[1.0, 2.0], 0).iter().all(Option::is_none));
        assert!(sma(&[], 3).is_empty());
    }

    #[test]
    fn rsi_saturates_without_losses() {
        let out = rsi(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);

        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_relative_eq!(out[2].unwrap(), 100.0);
        assert_relative_eq!(out[4].unwrap(), 100.0);
    }

    #[test]
    fn rsi_on_flat_series_is_saturated() {
        let out = rsi(&[5.0; 6], 2);
        assert_relative_eq!(out[1].unwrap(), 100.0);
        assert_relative_eq!(out[5].unwrap(), 100.0);
    }

    #[test]
    fn rsi_matches_hand_computed_wilder_values() {
        //changes: +2, -1, +2, -1 with alpha = 1/3
        //avg gain: 2/3, 4/9, 26/27, 52/81
        //avg loss: 0, 1/3, 2/9, 13/27
        let out = rsi(&[10.0, 12.0, 11.0, 13.0, 12.0], 3);

        assert_eq!(out[1], None);
        assert_relative_eq!(out[2].unwrap(), 400.0 / 7.0, epsilon = 1e-9);
        assert_relative_eq!(out[3].unwrap(), 81.25, epsilon = 1e-9);
        assert_relative_eq!(out[4].unwrap(), 400.0 / 7.0, epsilon = 1e-9);
    }

    #[test]
    fn rsi_smoothing_remembers_old_moves() {
        //a rolling mean over 2 changes would forget the early drop and read 100
        let out = rsi(&[10.0, 5.0, 6.0, 7.0], 2);
        let last = out[3].unwrap();
        assert!(last < 100.0);
        assert!(last > 50.0);
    }

    #[test]
    fn rsi_with_unit_period_is_defined_everywhere() {
        let out = rsi(&[3.0, 2.0, 4.0], 1);
        assert_eq!(out, vec![Some(100.0), Some(0.0), Some(100.0)]);
    }

    #[test]
    fn rsi_stays_in_bounds() {
        let prices = [44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8, 46.1, 45.9];
        for value in rsi(&prices, 5).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn indicators_are_prefix_stable() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let full_sma = sma(&prices, 7);
        let full_rsi = rsi(&prices, 7);

        for k in 1..prices.len() {
            assert_eq!(&sma(&prices[..k], 7)[..], &full_sma[..k]);
            assert_eq!(&rsi(&prices[..k], 7)[..], &full_rsi[..k]);
        }
    }
}
