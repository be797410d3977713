pub mod broker;
pub mod config;
pub mod error;
pub mod types;

pub use broker::{Broker, CandleSource, OrderSink};
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
