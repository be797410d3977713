pub mod ema;
pub mod fractal;
pub mod sma;

pub use ema::ema;
pub use fractal::{detect_fractals, FractalFlags};
pub use sma::sma;

/// Indicator values aligned 1:1 with a bar sequence.
/// `None` marks bars before the indicator has enough history.
pub type IndicatorSeries = Vec<Option<f64>>;
