use crate::error::EngineError;
use crate::models::Candle;
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

const NAIVE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const OFFSET_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
];

/// Inclusive calendar-date window applied to candles before a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CandleWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CandleWindow {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none()
    }

    pub fn contains(&self, time: &NaiveDateTime) -> bool {
        let date = time.date();
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }

    pub fn apply(&self, candles: Vec<Candle>) -> Vec<Candle> {
        if self.is_empty() {
            return candles;
        }
        candles
            .into_iter()
            .filter(|candle| self.contains(&candle.time))
            .collect()
    }
}

/// Fails on the first candle whose timestamp precedes its predecessor. Equal timestamps are allowed.
pub fn ensure_sorted(candles: &[Candle]) -> Result<(), EngineError> {
    match candles
        .windows(2)
        .position(|pair| pair[1].time < pair[0].time)
    {
        Some(pos) => Err(EngineError::UnsortedCandles {
            index: pos + 1,
            time: candles[pos + 1].time,
        }),
        None => Ok(()),
    }
}

/// Parses a candle timestamp. Offsets are dropped so the exchange wall-clock time is kept.
pub fn parse_candle_time(raw: &str) -> Result<NaiveDateTime> {
    let value = raw.trim();

    for format in OFFSET_TIME_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Ok(parsed.naive_local());
        }
    }
    for format in NAIVE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }

    Err(anyhow!("Unrecognized candle timestamp '{}'", value))
}

/// Normalizes a trading symbol by trimming whitespace and uppercasing.
pub fn normalize_trading_symbol(value: &str) -> Option<String> {
    let normalized = value.trim().to_uppercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
