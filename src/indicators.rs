use crate::error::EngineError;
use crate::models::Candle;
use chrono::NaiveDateTime;

/// Heikin-Ashi reconstruction of one source candle, positionally aligned with it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothedCandle {
    pub time: NaiveDateTime,
    pub open: f64,
    pub close: f64,
    pub trending_up: bool,
    pub trending_down: bool,
    pub turned_up: bool,
    pub turned_down: bool,
}

/// Computes Heikin-Ashi candles and trend-flip flags in one forward pass.
///
/// The smoothed close is the OHLC mean of the same bar. The smoothed open is
/// seeded with the mean of the first open and close, then each bar takes the
/// mean of the previous smoothed open and close. A bar "turns" up or down
/// when its trend flag is set and the previous bar's flag was not; the first
/// bar behaves as if preceded by a flat bar.
pub fn calculate_heikin_ashi(candles: &[Candle]) -> Result<Vec<SmoothedCandle>, EngineError> {
    let first = candles.first().ok_or(EngineError::EmptyInput)?;

    let mut smoothed = Vec::with_capacity(candles.len());
    let mut ha_open = (first.open + first.close) / 2.0;
    let mut prev_up = false;
    let mut prev_down = false;

    for (i, candle) in candles.iter().enumerate() {
        let ha_close = (candle.open + candle.high + candle.low + candle.close) / 4.0;
        if i > 0 {
            let prev: &SmoothedCandle = &smoothed[i - 1];
            ha_open = (prev.open + prev.close) / 2.0;
        }

        let trending_up = ha_close > ha_open;
        let trending_down = ha_close < ha_open;
        smoothed.push(SmoothedCandle {
            time: candle.time,
            open: ha_open,
            close: ha_close,
            trending_up,
            trending_down,
            turned_up: trending_up && !prev_up,
            turned_down: trending_down && !prev_down,
        });

        prev_up = trending_up;
        prev_down = trending_down;
    }

    Ok(smoothed)
}
