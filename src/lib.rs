pub mod candle_utils;
pub mod commands;
pub mod config;
pub mod context;
pub mod csv_io;
pub mod error;
pub mod forward;
pub mod indicators;
pub mod instruments;
pub mod kite;
pub mod market_data;
pub mod models;
pub mod performance;
pub mod simulator;
pub mod sweep;

pub use config::BacktestConfig;
pub use error::EngineError;
pub use indicators::{calculate_heikin_ashi, SmoothedCandle};
pub use models::{BacktestOutcome, Candle, Trade};
pub use simulator::run_backtest;
