/// Williams fractal flags aligned with a bar sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FractalFlags {
    /// `true` where the bar's high is a strict local maximum (resistance).
    pub highs: Vec<bool>,
    /// `true` where the bar's low is a strict local minimum (support).
    pub lows: Vec<bool>,
}

impl FractalFlags {
    pub fn len(&self) -> usize {
        self.highs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highs.is_empty()
    }

    /// Any fractal low within the `window` bars ending at `index` inclusive.
    pub fn recent_low(&self, index: usize, window: usize) -> bool {
        any_in_window(&self.lows, index, window)
    }

    /// Any fractal high within the `window` bars ending at `index` inclusive.
    pub fn recent_high(&self, index: usize, window: usize) -> bool {
        any_in_window(&self.highs, index, window)
    }
}

fn any_in_window(flags: &[bool], index: usize, window: usize) -> bool {
    if window == 0 || index >= flags.len() {
        return false;
    }
    let start = (index + 1).saturating_sub(window);
    flags[start..=index].iter().any(|&f| f)
}

/// Detect Williams fractals with a symmetric half-window of `period` bars.
///
/// A bar is a fractal high when its high is strictly greater than every
/// other high in `[i - period, i + period]`, and a fractal low when its low
/// is strictly less than every other low in that window. Any tie
/// disqualifies the bar. The first and last `period` bars are never flagged.
pub fn detect_fractals(highs: &[f64], lows: &[f64], period: usize) -> FractalFlags {
    let len = highs.len().min(lows.len());
    let mut flags = FractalFlags {
        highs: vec![false; len],
        lows: vec![false; len],
    };

    if len <= 2 * period {
        return flags;
    }

    for i in period..len - period {
        let window = i - period..=i + period;
        flags.highs[i] = window
            .clone()
            .filter(|&j| j != i)
            .all(|j| highs[j] < highs[i]);
        flags.lows[i] = window.filter(|&j| j != i).all(|j| lows[j] > lows[i]);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_spike_is_fractal_high() {
        let highs = vec![1.0, 2.0, 5.0, 2.0, 1.0];
        let lows = vec![0.5, 1.5, 4.5, 1.5, 0.5];
        let flags = detect_fractals(&highs, &lows, 2);
        assert_eq!(flags.highs, vec![false, false, true, false, false]);
        assert!(flags.lows.iter().all(|&f| !f));
    }

    #[test]
    fn single_dip_is_fractal_low() {
        let highs = vec![5.0, 4.0, 2.0, 4.0, 5.0];
        let lows = vec![4.0, 3.0, 1.0, 3.0, 4.0];
        let flags = detect_fractals(&highs, &lows, 2);
        assert_eq!(flags.lows, vec![false, false, true, false, false]);
    }

    #[test]
    fn flat_plateau_yields_no_fractal_high() {
        // Flat run, then a plateau of equal highs, then flat again.
        let highs = vec![1.0, 1.0, 3.0, 3.0, 3.0, 1.0, 1.0, 1.0];
        let lows = vec![0.5; 8];
        let flags = detect_fractals(&highs, &lows, 2);
        assert!(flags.highs.iter().all(|&f| !f), "{:?}", flags.highs);
        // Equal lows everywhere tie too.
        assert!(flags.lows.iter().all(|&f| !f));
    }

    #[test]
    fn spike_after_flat_run_is_flagged_once() {
        let highs = vec![1.0, 1.0, 1.0, 1.0, 4.0, 1.0, 1.0, 1.0];
        let lows = vec![0.5; 8];
        let flags = detect_fractals(&highs, &lows, 2);
        assert_eq!(flags.highs.iter().filter(|&&f| f).count(), 1);
        assert!(flags.highs[4]);
    }

    #[test]
    fn boundary_bars_never_flagged() {
        // Extreme values at both ends would qualify if the window were clipped.
        let highs = vec![9.0, 8.0, 1.0, 1.5, 1.0, 8.0, 9.0];
        let lows = vec![0.1, 0.2, 1.0, 0.9, 1.0, 0.2, 0.1];
        let flags = detect_fractals(&highs, &lows, 2);
        for i in [0, 1, 5, 6] {
            assert!(!flags.highs[i] && !flags.lows[i], "index {i} flagged");
        }
    }

    #[test]
    fn sequence_shorter_than_window_has_no_flags() {
        let flags = detect_fractals(&[1.0, 3.0, 1.0], &[1.0, 0.0, 1.0], 2);
        assert_eq!(flags.len(), 3);
        assert!(flags.highs.iter().chain(&flags.lows).all(|&f| !f));
    }

    #[test]
    fn recent_window_is_inclusive_of_current_bar() {
        let flags = FractalFlags {
            highs: vec![false; 6],
            lows: vec![false, false, true, false, false, false],
        };
        assert!(flags.recent_low(4, 3)); // bars 2..=4
        assert!(!flags.recent_low(5, 3)); // bars 3..=5
        assert!(flags.recent_low(2, 1));
        assert!(!flags.recent_low(4, 0));
    }
}
