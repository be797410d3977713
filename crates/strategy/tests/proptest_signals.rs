use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use common::{Bar, Direction};
use strategy::indicators::detect_fractals;
use strategy::{FractalEmaParams, FractalEmaStrategy, StrategyConfig, StrategyFileConfig, Variant};

fn bars_from(steps: &[(f64, f64, f64)]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let mut price = 1.1;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(delta, up, down))| {
            let open = price;
            price = (price + delta).max(0.01);
            let close = price;
            let high = open.max(close) + up;
            let low = (open.min(close) - down).max(0.001);
            Bar::new(i, start + Duration::minutes(i as i64), open, high, low, close)
        })
        .collect()
}

fn price_steps(max_len: usize) -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((-0.01f64..0.01, 0.0f64..0.005, 0.0f64..0.005), 0..max_len)
}

fn scalper(variant: Variant, reverse: bool) -> FractalEmaStrategy {
    let cfg: StrategyConfig = StrategyFileConfig::parse(
        "[[strategy]]\ntype = \"fractal_ema\"\nname = \"prop\"\ninstrument = \"EUR_USD\"\ncandles = 300\n",
    )
    .unwrap()
    .strategies
    .remove(0);
    let params = FractalEmaParams {
        reverse_signals: reverse,
        ..FractalEmaParams::preset(variant)
    };
    FractalEmaStrategy::new(cfg, params).unwrap()
}

fn any_variant() -> impl Strategy<Value = Variant> {
    prop_oneof![
        Just(Variant::Classic),
        Just(Variant::WideConfirm),
        Just(Variant::PriceLevels),
    ]
}

proptest! {
    /// One signal record per input bar, for every variant.
    #[test]
    fn history_length_matches_bars(steps in price_steps(260), variant in any_variant(), reverse in any::<bool>()) {
        let bars = bars_from(&steps);
        let series = scalper(variant, reverse).evaluate_series(&bars);
        prop_assert_eq!(series.signals.len(), bars.len());
        prop_assert_eq!(series.ema_slow.len(), bars.len());
        prop_assert_eq!(series.fractals.len(), bars.len());
    }

    /// Bars before the warm-up index never carry a signal.
    #[test]
    fn warmup_bars_are_none(steps in price_steps(260), variant in any_variant(), reverse in any::<bool>()) {
        let bars = bars_from(&steps);
        let strategy = scalper(variant, reverse);
        let warmup = strategy.params().warmup;
        let series = strategy.evaluate_series(&bars);
        for signal in series.signals.iter().take(warmup) {
            prop_assert_eq!(signal.direction, Direction::None);
            prop_assert!(!signal.entry);
            prop_assert!(!signal.exit);
        }
    }

    /// Entry and direction always agree, and entries carry a stop.
    #[test]
    fn entries_carry_direction_and_stop(steps in price_steps(260), variant in any_variant(), reverse in any::<bool>()) {
        let bars = bars_from(&steps);
        let series = scalper(variant, reverse).evaluate_series(&bars);
        for signal in series.signals.iter() {
            prop_assert_eq!(signal.entry, signal.direction != Direction::None);
            prop_assert_eq!(signal.entry, signal.stop_loss.is_some());
        }
    }

    /// Evaluating the same bars twice gives bit-identical output.
    #[test]
    fn evaluation_is_idempotent(steps in price_steps(260), reverse in any::<bool>()) {
        let bars = bars_from(&steps);
        let strategy = scalper(Variant::PriceLevels, reverse);
        let first = strategy.evaluate_series(&bars);
        let second = strategy.evaluate_series(&bars);
        for (a, b) in first.signals.iter().zip(second.signals.iter()) {
            prop_assert_eq!(a.stop_loss.map(f64::to_bits), b.stop_loss.map(f64::to_bits));
            prop_assert_eq!(a.take_profit.map(f64::to_bits), b.take_profit.map(f64::to_bits));
        }
        prop_assert_eq!(first, second);
    }

    /// The first and last `period` bars are never flagged.
    #[test]
    fn fractal_boundaries_never_flagged(
        highs in prop::collection::vec(0.0f64..10.0, 0..60),
        period in 1usize..5,
    ) {
        let lows: Vec<f64> = highs.iter().map(|h| h - 1.0).collect();
        let flags = detect_fractals(&highs, &lows, period);
        let n = highs.len();
        for i in 0..n {
            if i < period || i + period >= n {
                prop_assert!(!flags.highs[i], "high flagged at {}", i);
                prop_assert!(!flags.lows[i], "low flagged at {}", i);
            }
        }
    }

    /// A flagged fractal high strictly dominates its whole window.
    #[test]
    fn fractal_high_is_strict_window_maximum(
        highs in prop::collection::vec(0.0f64..10.0, 5..60),
    ) {
        let lows = highs.clone();
        let flags = detect_fractals(&highs, &lows, 2);
        for (i, &flagged) in flags.highs.iter().enumerate() {
            if flagged {
                for j in i - 2..=i + 2 {
                    if j != i {
                        prop_assert!(highs[j] < highs[i]);
                    }
                }
            }
        }
    }
}
