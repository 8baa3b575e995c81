use crate::candle_utils::CandleWindow;
use crate::commands::{report_outcome, ConfigOverrides};
use crate::context::AppContext;
use crate::csv_io::read_candles_from_path;
use crate::performance::PerformanceSummary;
use crate::simulator::run_backtest;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

pub async fn run(
    app: &AppContext,
    input: &Path,
    output: Option<&Path>,
    window: CandleWindow,
    overrides: &ConfigOverrides,
    print_json: bool,
) -> Result<PerformanceSummary> {
    let config = overrides.apply(app.backtest_config()?)?;
    info!(
        "Backtesting {} (mode {:?}, sizing {:?}, capital {:.2})",
        input.display(),
        config.signal_mode,
        config.position_sizing,
        config.initial_capital
    );

    let candles = window.apply(read_candles_from_path(input)?);
    info!("Loaded {} candles", candles.len());

    let outcome = run_backtest(&candles, &config)
        .with_context(|| format!("Backtest of {} failed", input.display()))?;
    report_outcome("Backtest", &outcome, output, print_json)
}
