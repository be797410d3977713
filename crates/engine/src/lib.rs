pub mod executor;
pub mod oanda;
pub mod runner;

pub use executor::{ExecutionReport, OrderExecutor};
pub use oanda::OandaClient;
pub use runner::{CycleOutcome, Runner, RunnerSettings};
