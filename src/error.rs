use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors raised by the simulation core. I/O boundaries wrap these in `anyhow`.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("candle sequence is empty")]
    EmptyInput,
    #[error("candles must be sorted ascending by time (candle {index} at {time} precedes its predecessor)")]
    UnsortedCandles { index: usize, time: NaiveDateTime },
    #[error("candle {index} has no signal value and missing signals are rejected")]
    MissingSignal { index: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
