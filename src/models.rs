use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Timestamp layout used for every timestamp the engine writes out.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Exchange wall-clock time of the bar.
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Externally supplied BUY/SELL marker. `None` when the source carries no signal column.
    #[serde(default)]
    pub signal: Option<SignalAction>,
}

impl Candle {
    pub fn new(time: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            signal: None,
        }
    }

    pub fn with_signal(mut self, signal: SignalAction) -> Self {
        self.signal = Some(signal);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl FromStr for SignalAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(SignalAction::Buy),
            "sell" => Ok(SignalAction::Sell),
            "hold" | "" => Ok(SignalAction::Hold),
            other => Err(anyhow!("Unknown signal action '{}'", other)),
        }
    }
}

/// The single open long position of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub quantity: u64,
}

impl Position {
    pub fn realized_pnl(&self, exit_price: f64, commission: f64) -> f64 {
        (exit_price - self.entry_price) * self.quantity as f64 - commission
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Signal,
    DrawdownStop,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Signal => "signal exit",
            ExitReason::DrawdownStop => "drawdown stop",
        }
    }

    /// Value of the `side` column in exported trade ledgers.
    pub fn ledger_side(&self) -> &'static str {
        match self {
            ExitReason::Signal => "BUY",
            ExitReason::DrawdownStop => "BUY (STOP)",
        }
    }
}

/// One closed round-trip trade in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub serial: usize,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: u64,
    pub exit_reason: ExitReason,
    pub pnl: f64,
    pub capital_after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestOutcome {
    pub trades: Vec<Trade>,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub peak_capital: f64,
    /// Entry signals ignored because not even one lot was affordable.
    pub skipped_entries: usize,
    /// Position still open after the last bar. It is not part of the ledger.
    pub unclosed_position: Option<Position>,
}

impl BacktestOutcome {
    pub fn empty(initial_capital: f64) -> Self {
        Self {
            trades: Vec::new(),
            initial_capital,
            final_capital: initial_capital,
            peak_capital: initial_capital,
            skipped_entries: 0,
            unclosed_position: None,
        }
    }

    pub fn net_pnl(&self) -> f64 {
        self.trades.iter().map(|trade| trade.pnl).sum()
    }
}
