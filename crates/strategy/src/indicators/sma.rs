use super::IndicatorSeries;

/// Simple Moving Average: mean of the trailing `window` values ending at
/// each index. Undefined for indices before `window - 1`.
pub fn sma(values: &[f64], window: usize) -> IndicatorSeries {
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }

    // Summed per window rather than as a running total so equal inputs give
    // bit-equal means, which the crossover comparisons rely on.
    for (offset, slot) in out.iter_mut().enumerate().skip(window - 1) {
        let start = offset + 1 - window;
        let sum: f64 = values[start..=offset].iter().sum();
        *slot = Some(sum / window as f64);
    }
    out
}
