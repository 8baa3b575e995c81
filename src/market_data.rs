use crate::candle_utils::CandleWindow;
use crate::csv_io::read_candles_from_path;
use crate::models::Candle;
use anyhow::Result;
use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;

/// Bar sizes offered by the historical data endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum CandleInterval {
    #[value(name = "minute", alias = "1minute")]
    Minute,
    #[value(name = "3minute")]
    ThreeMinute,
    #[value(name = "5minute")]
    FiveMinute,
    #[value(name = "15minute")]
    FifteenMinute,
    #[value(name = "30minute")]
    ThirtyMinute,
    #[value(name = "60minute", alias = "1hour")]
    SixtyMinute,
    #[value(name = "day")]
    Day,
}

impl CandleInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandleInterval::Minute => "minute",
            CandleInterval::ThreeMinute => "3minute",
            CandleInterval::FiveMinute => "5minute",
            CandleInterval::FifteenMinute => "15minute",
            CandleInterval::ThirtyMinute => "30minute",
            CandleInterval::SixtyMinute => "60minute",
            CandleInterval::Day => "day",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleRequest {
    pub trading_symbol: String,
    pub exchange: String,
    pub interval: CandleInterval,
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

/// Anything that can hand the engine a time-ordered candle series.
#[allow(async_fn_in_trait)]
pub trait CandleSource {
    fn name(&self) -> &str;
    async fn fetch_candles(&self, request: &CandleRequest) -> Result<Vec<Candle>>;
}

/// Candles replayed from a CSV file. The request only narrows the date range.
pub struct CsvCandleSource {
    path: PathBuf,
}

impl CsvCandleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CandleSource for CsvCandleSource {
    fn name(&self) -> &str {
        "csv"
    }

    async fn fetch_candles(&self, request: &CandleRequest) -> Result<Vec<Candle>> {
        let candles = read_candles_from_path(&self.path)?;
        let window = CandleWindow {
            start_date: Some(request.from.date()),
            end_date: Some(request.to.date()),
        };
        Ok(window.apply(candles))
    }
}
