pub mod backtest;
pub mod forward_test;
pub mod strikes;
pub mod sweep;

use crate::config::{BacktestConfig, MissingSignalPolicy, PositionSizing, SignalMode};
use crate::csv_io::write_trades_to_path;
use crate::models::BacktestOutcome;
use crate::performance::PerformanceSummary;
use anyhow::{Context, Result};
use clap::Args;
use log::{info, warn};
use std::path::Path;

/// Command-line overrides layered over the environment settings.
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Starting capital
    #[arg(long)]
    pub capital: Option<f64>,
    /// Units per lot
    #[arg(long)]
    pub lot_size: Option<u32>,
    /// Commission charged once per round-trip trade
    #[arg(long)]
    pub commission: Option<f64>,
    /// Fraction of peak capital that may be lost before open positions are stopped out
    #[arg(long)]
    pub max_drawdown: Option<f64>,
    /// Trade on Heikin-Ashi trend flips or on the file's BUY/SELL column
    #[arg(long, value_enum)]
    pub signal_mode: Option<SignalMode>,
    /// Size entries dynamically from capital or always buy one lot
    #[arg(long, value_enum)]
    pub sizing: Option<PositionSizing>,
    /// Handling of candles without a signal value in external-signal mode
    #[arg(long, value_enum)]
    pub missing_signal: Option<MissingSignalPolicy>,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: BacktestConfig) -> Result<BacktestConfig> {
        if let Some(capital) = self.capital {
            config.initial_capital = capital;
        }
        if let Some(lot_size) = self.lot_size {
            config.lot_size = lot_size;
        }
        if let Some(commission) = self.commission {
            config.commission = commission;
        }
        if let Some(max_drawdown) = self.max_drawdown {
            config.max_drawdown_ratio = max_drawdown;
        }
        if let Some(signal_mode) = self.signal_mode {
            config.signal_mode = signal_mode;
        }
        if let Some(sizing) = self.sizing {
            config.position_sizing = sizing;
        }
        if let Some(policy) = self.missing_signal {
            config.missing_signal_policy = policy;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Logs the summary, writes the ledger and optionally prints the summary as JSON.
pub(crate) fn report_outcome(
    label: &str,
    outcome: &BacktestOutcome,
    output: Option<&Path>,
    print_json: bool,
) -> Result<PerformanceSummary> {
    let summary = PerformanceSummary::from_outcome(outcome);

    if outcome.trades.is_empty() {
        warn!("{}: no trades executed", label);
    } else {
        info!(
            "{}: {} trades ({} wins, {} losses, {} drawdown stops), net P&L {:.2}, final capital {:.2}",
            label,
            summary.total_trades,
            summary.winning_trades,
            summary.losing_trades,
            summary.drawdown_stops,
            summary.net_pnl,
            summary.final_capital
        );
    }
    if summary.skipped_entries > 0 {
        info!(
            "{}: {} entry signals skipped for insufficient capital",
            label, summary.skipped_entries
        );
    }
    if let Some(position) = outcome.unclosed_position.as_ref() {
        info!(
            "{}: position of {} opened at {} ({:.2}) still open at end of data",
            label, position.quantity, position.entry_time, position.entry_price
        );
    }

    if let Some(path) = output {
        write_trades_to_path(path, &outcome.trades)?;
        info!("Trade ledger written to {}", path.display());
    }

    if print_json {
        let json =
            serde_json::to_string_pretty(&summary).context("failed to serialize summary")?;
        println!("{}", json);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_given_fields() {
        let overrides = ConfigOverrides {
            capital: Some(5_000.0),
            sizing: Some(PositionSizing::FixedOneLot),
            ..ConfigOverrides::default()
        };
        let config = overrides.apply(BacktestConfig::default()).unwrap();
        assert_eq!(config.initial_capital, 5_000.0);
        assert_eq!(config.position_sizing, PositionSizing::FixedOneLot);
        assert_eq!(config.lot_size, BacktestConfig::default().lot_size);
    }

    #[test]
    fn overrides_are_validated() {
        let overrides = ConfigOverrides {
            max_drawdown: Some(2.0),
            ..ConfigOverrides::default()
        };
        assert!(overrides.apply(BacktestConfig::default()).is_err());
    }
}
