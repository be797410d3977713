use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC price bar. Sequences of bars are ordered oldest-first and
/// `index` is the bar's position in the fetched sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub index: usize,
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(index: usize, time: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            index,
            time,
            open,
            high,
            low,
            close,
        }
    }
}

/// Trade direction recorded against a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    None,
    Long,
    Short,
}

impl Direction {
    /// LONG <-> SHORT; NONE stays NONE.
    pub fn opposite(self) -> Self {
        match self {
            Direction::None => Direction::None,
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// Sign applied to a unit count when opening a position in this direction.
    pub fn sign(self) -> i64 {
        match self {
            Direction::None => 0,
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::None => write!(f, "NONE"),
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Candle granularity, using the broker's codes (`M1`, `H1`, `D`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Granularity {
    S5,
    #[default]
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D,
}

impl Granularity {
    pub fn code(self) -> &'static str {
        match self {
            Granularity::S5 => "S5",
            Granularity::M1 => "M1",
            Granularity::M5 => "M5",
            Granularity::M15 => "M15",
            Granularity::M30 => "M30",
            Granularity::H1 => "H1",
            Granularity::H4 => "H4",
            Granularity::D => "D",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Granularity {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "S5" => Ok(Granularity::S5),
            "M1" => Ok(Granularity::M1),
            "M5" => Ok(Granularity::M5),
            "M15" => Ok(Granularity::M15),
            "M30" => Ok(Granularity::M30),
            "H1" => Ok(Granularity::H1),
            "H4" => Ok(Granularity::H4),
            "D" => Ok(Granularity::D),
            other => Err(crate::Error::Config(format!("unknown granularity '{other}'"))),
        }
    }
}

/// Side of a market order, derived from the sign of its units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A market order to be submitted to the broker.
/// Positive `units` buy, negative `units` sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub instrument: String,
    pub units: i64,
    /// Stop-loss price attached on fill, if any.
    pub stop_loss: Option<f64>,
    /// Take-profit price attached on fill, if any.
    pub take_profit: Option<f64>,
}

impl Order {
    pub fn market(instrument: impl Into<String>, units: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            instrument: instrument.into(),
            units,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn with_levels(mut self, stop_loss: Option<f64>, take_profit: Option<f64>) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    pub fn side(&self) -> OrderSide {
        if self.units >= 0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        }
    }
}

/// Confirmation of a filled order returned by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    /// Broker trade id opened (or closed) by this fill.
    pub trade_id: Option<String>,
    pub instrument: String,
    pub units: i64,
    pub fill_price: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// What the broker did with a submitted order. Transport failures are
/// reported as `Err`, never as one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderOutcome {
    Filled(Fill),
    Rejected(RejectionReason),
}

/// Reason an order was not filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The broker refused the order outright.
    Broker { code: String, message: String },
    /// The order was accepted and then cancelled (e.g. fill-or-kill miss).
    Cancelled(String),
    /// No price was available to fill against.
    NoPrice,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::Broker { code, message } => write!(f, "{code}: {message}"),
            RejectionReason::Cancelled(reason) => write!(f, "cancelled: {reason}"),
            RejectionReason::NoPrice => write!(f, "no price available"),
        }
    }
}

/// Which account the runner trades against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Practice,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Practice => write!(f, "practice"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

impl std::str::FromStr for TradingMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(TradingMode::Live),
            "practice" => Ok(TradingMode::Practice),
            "paper" => Ok(TradingMode::Paper),
            other => Err(crate::Error::Config(format!(
                "TRADING_MODE must be 'live', 'practice' or 'paper', got: '{other}'"
            ))),
        }
    }
}
