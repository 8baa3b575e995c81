use crate::candle_utils::parse_candle_time;
use crate::models::{Candle, SignalAction, Trade, TIME_FORMAT};
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim, Writer};
use log::warn;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const REQUIRED_COLUMNS: [&str; 5] = ["time", "open", "high", "low", "close"];
const SIGNAL_COLUMN: &str = "signal";

/// Row layout of an exported trade ledger.
#[derive(Debug, Serialize)]
struct TradeRow {
    #[serde(rename = "S.No")]
    serial: usize,
    time: String,
    exit_time: String,
    entry: f64,
    exit: f64,
    qty: u64,
    side: &'static str,
    pnl: f64,
    capital_after: f64,
}

impl From<&Trade> for TradeRow {
    fn from(trade: &Trade) -> Self {
        Self {
            serial: trade.serial,
            time: trade.entry_time.format(TIME_FORMAT).to_string(),
            exit_time: trade.exit_time.format(TIME_FORMAT).to_string(),
            entry: trade.entry_price,
            exit: trade.exit_price,
            qty: trade.quantity,
            side: trade.exit_reason.ledger_side(),
            pnl: trade.pnl,
            capital_after: trade.capital_after,
        }
    }
}

struct ColumnIndex {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    signal: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| names.iter().position(|candidate| candidate == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| find(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(anyhow!(
                "CSV must contain: {} (missing: {})",
                REQUIRED_COLUMNS.join(", "),
                missing.join(", ")
            ));
        }

        Ok(Self {
            time: find("time").unwrap_or_default(),
            open: find("open").unwrap_or_default(),
            high: find("high").unwrap_or_default(),
            low: find("low").unwrap_or_default(),
            close: find("close").unwrap_or_default(),
            signal: find(SIGNAL_COLUMN),
        })
    }
}

pub fn read_candles_from_path(path: &Path) -> Result<Vec<Candle>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open candle file {}", path.display()))?;
    read_candles(file).with_context(|| format!("Failed to read candles from {}", path.display()))
}

/// Reads candles from CSV with case-insensitive `time, open, high, low, close` headers
/// and an optional `signal` column.
pub fn read_candles<R: Read>(reader: R) -> Result<Vec<Candle>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let columns = ColumnIndex::from_headers(rdr.headers().context("Failed to read CSV header")?)?;

    let mut candles = Vec::new();
    let mut unknown_signals = 0usize;
    for (idx, record) in rdr.records().enumerate() {
        let line = idx + 2;
        let record = record.with_context(|| format!("Malformed CSV row at line {}", line))?;

        let field = |column: usize| record.get(column).unwrap_or("");
        let price = |column: usize, name: &str| -> Result<f64> {
            let raw = field(column);
            let value = raw
                .parse::<f64>()
                .map_err(|_| anyhow!("Invalid {} '{}' at line {}", name, raw, line))?;
            if !value.is_finite() {
                return Err(anyhow!("Non-finite {} '{}' at line {}", name, raw, line));
            }
            Ok(value)
        };

        let time = parse_candle_time(field(columns.time))
            .with_context(|| format!("Invalid time at line {}", line))?;
        let mut candle = Candle::new(
            time,
            price(columns.open, "open")?,
            price(columns.high, "high")?,
            price(columns.low, "low")?,
            price(columns.close, "close")?,
        );

        if let Some(signal_column) = columns.signal {
            let action = match field(signal_column).parse::<SignalAction>() {
                Ok(action) => action,
                Err(_) => {
                    unknown_signals += 1;
                    SignalAction::Hold
                }
            };
            candle.signal = Some(action);
        }

        candles.push(candle);
    }

    if unknown_signals > 0 {
        warn!(
            "{} signal values were not BUY/SELL/HOLD and are treated as no signal",
            unknown_signals
        );
    }

    Ok(candles)
}

pub fn write_trades_to_path(path: &Path, trades: &[Trade]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create trades file {}", path.display()))?;
    write_trades(file, trades)
        .with_context(|| format!("Failed to write trades to {}", path.display()))
}

/// Writes the ledger as `S.No, time, exit_time, entry, exit, qty, side, pnl, capital_after`.
pub fn write_trades<W: Write>(writer: W, trades: &[Trade]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    if trades.is_empty() {
        wtr.write_record([
            "S.No",
            "time",
            "exit_time",
            "entry",
            "exit",
            "qty",
            "side",
            "pnl",
            "capital_after",
        ])?;
    }
    for trade in trades {
        wtr.serialize(TradeRow::from(trade))
            .with_context(|| format!("Failed to write trade {}", trade.serial))?;
    }
    wtr.flush().context("Failed to flush trades CSV")?;
    Ok(())
}
