use common::Direction;
use serde::Serialize;

/// Strategy output for a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BarSignal {
    pub entry: bool,
    pub exit: bool,
    pub direction: Direction,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl BarSignal {
    /// No entry, no exit, no direction.
    pub const NONE: BarSignal = BarSignal {
        entry: false,
        exit: false,
        direction: Direction::None,
        stop_loss: None,
        take_profit: None,
    };

    pub fn is_actionable(&self) -> bool {
        self.entry || self.exit
    }
}

/// State handed from bar `i - 1` to the evaluation of bar `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Carry {
    /// Direction recorded on the previous bar.
    pub direction: Direction,
    /// Bar on which that direction was recorded.
    pub entry_index: Option<usize>,
}

impl Carry {
    fn advance(self, index: usize, signal: &BarSignal) -> Carry {
        match signal.direction {
            Direction::None => Carry::default(),
            direction => Carry {
                direction,
                entry_index: Some(index),
            },
        }
    }
}

/// Full per-bar signal history, one record per input bar.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SignalHistory {
    signals: Vec<BarSignal>,
}

impl SignalHistory {
    /// Build a history of `len` bars by folding `step` over the bar indices.
    /// `step` sees only the carry produced by the bar before it.
    pub fn fold<F>(len: usize, mut step: F) -> Self
    where
        F: FnMut(usize, Carry) -> BarSignal,
    {
        let mut signals = Vec::with_capacity(len);
        let mut carry = Carry::default();
        for index in 0..len {
            let signal = step(index, carry);
            carry = carry.advance(index, &signal);
            signals.push(signal);
        }
        Self { signals }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BarSignal> {
        self.signals.get(index)
    }

    /// The record the caller acts on.
    pub fn last(&self) -> Option<&BarSignal> {
        self.signals.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BarSignal> {
        self.signals.iter()
    }

    pub fn entries(&self) -> Vec<bool> {
        self.signals.iter().map(|s| s.entry).collect()
    }

    pub fn exits(&self) -> Vec<bool> {
        self.signals.iter().map(|s| s.exit).collect()
    }

    pub fn directions(&self) -> Vec<Direction> {
        self.signals.iter().map(|s| s.direction).collect()
    }
}
