use super::IndicatorSeries;

/// Exponential Moving Average over the whole series.
///
/// Smoothing factor is `2 / (period + 1)`. The first defined value sits at
/// index `period - 1` and is the simple average of the first `period`
/// values; every later value follows `ema[i] = a * x[i] + (1 - a) * ema[i - 1]`.
/// Returns all `None` when the series is shorter than `period`.
pub fn ema(values: &[f64], period: usize) -> IndicatorSeries {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(seed);

    let mut prev = seed;
    for (i, &value) in values.iter().enumerate().skip(period) {
        prev = value * k + prev * (1.0 - k);
        out[i] = Some(prev);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_undefined_before_seed_index() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let series = ema(&values, 4);
        assert!(series[..3].iter().all(Option::is_none));
        assert!(series[3..].iter().all(Option::is_some));
    }

    #[test]
    fn ema_seeds_with_simple_average() {
        let values = vec![2.0, 4.0, 6.0, 8.0];
        let series = ema(&values, 3);
        assert_eq!(series[2], Some(4.0));
    }

    #[test]
    fn ema_applies_recurrence_after_seed() {
        let values = vec![2.0, 4.0, 6.0, 8.0];
        let series = ema(&values, 3);
        // k = 0.5: 8 * 0.5 + 4 * 0.5
        assert_eq!(series[3], Some(6.0));
    }

    #[test]
    fn ema_all_undefined_when_too_short() {
        let series = ema(&[1.0, 2.0], 5);
        assert_eq!(series, vec![None, None]);
    }

    #[test]
    fn ema_of_constant_series_is_constant() {
        let series = ema(&[7.5; 30], 10);
        for v in series.iter().flatten() {
            assert!((v - 7.5).abs() < 1e-12);
        }
    }

    #[test]
    fn ema_lags_linear_trend_by_half_window() {
        // A linear series seeded at its SMA keeps a constant lag of (period - 1) / 2.
        let values: Vec<f64> = (0..200).map(|i| 100.0 + i as f64).collect();
        let series = ema(&values, 20);
        let last = series[199].unwrap();
        assert!((values[199] - last - 9.5).abs() < 1e-9, "lag was {}", values[199] - last);
    }
}
