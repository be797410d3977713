//! Williams fractal + triple EMA pullback strategy.
//!
//! Trend is read from the ordering of a fast, mid and slow EMA (20/50/100 by
//! default). A LONG entry needs a bullish ordering, a close above the slow
//! EMA, a pullback below the fast or mid EMA and a fractal low within the
//! confirmation window. A SHORT entry needs the bearish ordering, a close
//! below the slow EMA, a pullback above the fast EMA and a recent fractal
//! high. Exits are judged against the direction recorded on the previous bar.

use std::str::FromStr;

use common::{Bar, Direction, Error, Granularity, Result};
use tracing::{debug, trace};

use crate::config::StrategyConfig;
use crate::history::{BarSignal, Carry, SignalHistory};
use crate::indicators::{detect_fractals, ema, FractalFlags, IndicatorSeries};
use crate::{validate_bars, Decision, IntentPurpose, OrderIntent, Strategy};

/// Named parameter presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// 3-bar confirmation, stop level only.
    #[default]
    Classic,
    /// 5-bar confirmation, stop level only.
    WideConfirm,
    /// 3-bar confirmation, offset stop and take-profit as absolute prices.
    PriceLevels,
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "classic" => Ok(Variant::Classic),
            "wide_confirm" => Ok(Variant::WideConfirm),
            "price_levels" => Ok(Variant::PriceLevels),
            other => Err(Error::Config(format!("unknown fractal_ema variant '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FractalEmaParams {
    pub ema_fast: usize,
    pub ema_mid: usize,
    pub ema_slow: usize,
    /// Fractal half-window; 2 gives the usual 5-bar pattern.
    pub fractal_period: usize,
    /// Bars, ending at the current bar inclusive, searched for a fractal.
    pub fractal_confirm_window: usize,
    /// Subtracted from LONG stops and added to SHORT stops.
    pub stop_offset: f64,
    /// Take-profit distance as a multiple of stop distance.
    pub risk_reward: f64,
    /// Emit take-profit prices alongside stops.
    pub take_profit: bool,
    /// First bar index that is evaluated; earlier bars are always NONE.
    pub warmup: usize,
    /// Swap LONG and SHORT outputs.
    pub reverse_signals: bool,
}

impl Default for FractalEmaParams {
    fn default() -> Self {
        Self::preset(Variant::Classic)
    }
}

impl FractalEmaParams {
    pub fn preset(variant: Variant) -> Self {
        let base = Self {
            ema_fast: 20,
            ema_mid: 50,
            ema_slow: 100,
            fractal_period: 2,
            fractal_confirm_window: 3,
            stop_offset: 0.0,
            risk_reward: 1.5,
            take_profit: false,
            warmup: 105,
            reverse_signals: false,
        };
        match variant {
            Variant::Classic => base,
            Variant::WideConfirm => Self {
                fractal_confirm_window: 5,
                ..base
            },
            Variant::PriceLevels => Self {
                stop_offset: 0.0001,
                take_profit: true,
                ..base
            },
        }
    }

    /// Read a preset plus per-field overrides from a strategy's `params`.
    pub fn from_config(cfg: &StrategyConfig) -> Result<Self> {
        let variant = match cfg.param_str("variant")? {
            Some(name) => name.parse()?,
            None => Variant::default(),
        };
        let base = Self::preset(variant);
        Ok(Self {
            ema_fast: cfg.param_usize("ema_fast", base.ema_fast)?,
            ema_mid: cfg.param_usize("ema_mid", base.ema_mid)?,
            ema_slow: cfg.param_usize("ema_slow", base.ema_slow)?,
            fractal_period: cfg.param_usize("fractal_period", base.fractal_period)?,
            fractal_confirm_window: cfg
                .param_usize("fractal_confirm_window", base.fractal_confirm_window)?,
            stop_offset: cfg.param_f64("stop_offset", base.stop_offset)?,
            risk_reward: cfg.param_f64("risk_reward", base.risk_reward)?,
            take_profit: cfg.param_bool("take_profit", base.take_profit)?,
            warmup: cfg.param_usize("warmup", base.warmup)?,
            reverse_signals: cfg.param_bool("reverse_signals", base.reverse_signals)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Config(msg));
        if self.ema_fast == 0 || self.ema_fast >= self.ema_mid || self.ema_mid >= self.ema_slow {
            return fail(format!(
                "EMA periods must satisfy 0 < fast < mid < slow, got {}/{}/{}",
                self.ema_fast, self.ema_mid, self.ema_slow
            ));
        }
        if self.fractal_period == 0 {
            return fail("fractal_period must be positive".into());
        }
        if self.fractal_confirm_window == 0 {
            return fail("fractal_confirm_window must be positive".into());
        }
        if !self.stop_offset.is_finite() || self.stop_offset < 0.0 {
            return fail(format!("stop_offset must be >= 0, got {}", self.stop_offset));
        }
        if !self.risk_reward.is_finite() || self.risk_reward <= 0.0 {
            return fail(format!("risk_reward must be > 0, got {}", self.risk_reward));
        }
        if self.warmup < self.ema_slow {
            return fail(format!(
                "warmup ({}) must be at least the slow EMA period ({})",
                self.warmup, self.ema_slow
            ));
        }
        Ok(())
    }
}

/// Full per-bar output of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct FractalEmaSeries {
    pub signals: SignalHistory,
    pub ema_fast: IndicatorSeries,
    pub ema_mid: IndicatorSeries,
    pub ema_slow: IndicatorSeries,
    pub fractals: FractalFlags,
}

/// EMA values at one bar.
#[derive(Debug, Clone, Copy)]
struct Emas {
    fast: f64,
    mid: f64,
    slow: f64,
}

impl Emas {
    fn at(series: &FractalEmaSeries, i: usize) -> Option<Self> {
        Some(Self {
            fast: series.ema_fast[i]?,
            mid: series.ema_mid[i]?,
            slow: series.ema_slow[i]?,
        })
    }

    fn bullish(&self) -> bool {
        self.fast > self.mid && self.mid > self.slow
    }

    fn bearish(&self) -> bool {
        self.slow > self.mid && self.mid > self.fast
    }
}

pub struct FractalEmaStrategy {
    cfg: StrategyConfig,
    params: FractalEmaParams,
}

impl FractalEmaStrategy {
    pub fn new(cfg: StrategyConfig, params: FractalEmaParams) -> Result<Self> {
        params.validate().map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("strategy '{}': {msg}", cfg.name)),
            other => other,
        })?;
        Ok(Self { cfg, params })
    }

    pub fn params(&self) -> &FractalEmaParams {
        &self.params
    }

    /// Compute indicators and the signal record for every bar.
    /// Works on any length; bars before the warm-up index are NONE.
    pub fn evaluate_series(&self, bars: &[Bar]) -> FractalEmaSeries {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        let mut series = FractalEmaSeries {
            signals: SignalHistory::default(),
            ema_fast: ema(&closes, self.params.ema_fast),
            ema_mid: ema(&closes, self.params.ema_mid),
            ema_slow: ema(&closes, self.params.ema_slow),
            fractals: detect_fractals(&highs, &lows, self.params.fractal_period),
        };
        let signals = SignalHistory::fold(bars.len(), |i, carry| {
            self.evaluate_bar(&series, closes[i], i, carry)
        });
        series.signals = signals;
        series
    }

    fn evaluate_bar(&self, series: &FractalEmaSeries, close: f64, i: usize, carry: Carry) -> BarSignal {
        if i < self.params.warmup {
            return BarSignal::NONE;
        }
        let Some(emas) = Emas::at(series, i) else {
            return BarSignal::NONE;
        };
        let window = self.params.fractal_confirm_window;

        let mut direction = Direction::None;
        if emas.bullish() && close > emas.slow {
            let pullback = close < emas.fast || close < emas.mid;
            if pullback && series.fractals.recent_low(i, window) {
                direction = Direction::Long;
            }
        } else if emas.bearish()
            && close < emas.slow
            && close > emas.fast
            && series.fractals.recent_high(i, window)
        {
            direction = Direction::Short;
        }

        if self.params.reverse_signals {
            direction = direction.opposite();
        }

        let exit = match carry.direction {
            Direction::Long => !emas.bullish() || close < emas.slow,
            Direction::Short => !emas.bearish() || close > emas.slow,
            Direction::None => false,
        };
        if exit {
            trace!(
                bar = i,
                held = %carry.direction,
                entered_at = ?carry.entry_index,
                "Exit condition met"
            );
        }

        let stop_loss = self.stop_level(direction, close, emas);
        let take_profit = stop_loss
            .filter(|_| self.params.take_profit)
            .map(|stop| self.target_level(direction, close, stop));

        BarSignal {
            entry: direction != Direction::None,
            exit,
            direction,
            stop_loss,
            take_profit,
        }
    }

    /// Stops are derived from the final direction, so reversed signals get
    /// the formula of the direction they are actually emitted in.
    fn stop_level(&self, direction: Direction, close: f64, emas: Emas) -> Option<f64> {
        let offset = self.params.stop_offset;
        match direction {
            Direction::Long if close < emas.mid => Some(emas.slow - offset),
            Direction::Long => Some(emas.mid - offset),
            Direction::Short => Some(emas.mid + offset),
            Direction::None => None,
        }
    }

    fn target_level(&self, direction: Direction, close: f64, stop: f64) -> f64 {
        let distance = self.params.risk_reward * (close - stop).abs();
        match direction {
            Direction::Short => close - distance,
            _ => close + distance,
        }
    }
}

impl Strategy for FractalEmaStrategy {
    fn name(&self) -> &str {
        &self.cfg.name
    }

    fn instrument(&self) -> &str {
        &self.cfg.instrument
    }

    fn granularity(&self) -> Granularity {
        self.cfg.granularity
    }

    fn candles(&self) -> usize {
        self.cfg.candles
    }

    fn min_history(&self) -> usize {
        self.params.warmup + 1
    }

    fn evaluate(&self, bars: &[Bar]) -> Result<Decision> {
        validate_bars(bars)?;
        if bars.len() < self.min_history() {
            return Ok(Decision::InsufficientData {
                required: self.min_history(),
                available: bars.len(),
            });
        }

        let series = self.evaluate_series(bars);
        let n = series.signals.len();
        let (Some(last), Some(prev)) = (series.signals.get(n - 1), series.signals.get(n - 2)) else {
            return Ok(Decision::Hold);
        };

        debug!(
            strategy = %self.cfg.name,
            direction = %last.direction,
            entry = last.entry,
            exit = last.exit,
            "Latest bar evaluated"
        );

        let mut intents = Vec::new();
        if last.exit {
            intents.push(OrderIntent {
                instrument: self.cfg.instrument.clone(),
                units: -prev.direction.sign() * self.cfg.units,
                purpose: IntentPurpose::Exit(prev.direction),
                stop_loss: None,
                take_profit: None,
            });
        }
        if last.entry {
            intents.push(OrderIntent {
                instrument: self.cfg.instrument.clone(),
                units: last.direction.sign() * self.cfg.units,
                purpose: IntentPurpose::Entry(last.direction),
                stop_loss: last.stop_loss,
                take_profit: last.take_profit,
            });
        }

        if intents.is_empty() {
            Ok(Decision::Hold)
        } else {
            Ok(Decision::Act(intents))
        }
    }
}
