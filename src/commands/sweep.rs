use crate::candle_utils::CandleWindow;
use crate::commands::ConfigOverrides;
use crate::context::AppContext;
use crate::csv_io::read_candles_from_path;
use crate::performance::PerformanceSummary;
use crate::sweep::{build_grid, run_sweep};
use anyhow::{anyhow, Result};
use log::{info, warn};
use std::path::Path;

/// Backtests every capital/drawdown combination and returns the summaries of successful runs.
pub async fn run(
    app: &AppContext,
    input: &Path,
    window: CandleWindow,
    capitals: &[f64],
    drawdown_ratios: &[f64],
    overrides: &ConfigOverrides,
    print_json: bool,
) -> Result<Vec<PerformanceSummary>> {
    let base = overrides.apply(app.backtest_config()?)?;
    let candles = window.apply(read_candles_from_path(input)?);
    if candles.is_empty() {
        return Err(anyhow!("No candles in {} for the requested window", input.display()));
    }

    let configs = build_grid(&base, capitals, drawdown_ratios);
    info!(
        "Sweeping {} configurations over {} candles",
        configs.len(),
        candles.len()
    );

    let mut summaries = Vec::with_capacity(configs.len());
    for (config, result) in configs.iter().zip(run_sweep(&candles, &configs)) {
        match result {
            Ok(outcome) => {
                let summary = PerformanceSummary::from_outcome(&outcome);
                info!(
                    "capital {:>12.2} | max drawdown {:>5.1}% | trades {:>4} | win rate {:>5.1}% | net P&L {:>12.2} | final {:>12.2}",
                    config.initial_capital,
                    config.max_drawdown_ratio * 100.0,
                    summary.total_trades,
                    summary.win_rate * 100.0,
                    summary.net_pnl,
                    summary.final_capital
                );
                summaries.push(summary);
            }
            Err(err) => warn!(
                "capital {:.2} / max drawdown {:.2} skipped: {}",
                config.initial_capital, config.max_drawdown_ratio, err
            ),
        }
    }

    if print_json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    Ok(summaries)
}
