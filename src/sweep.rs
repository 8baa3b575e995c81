use crate::config::BacktestConfig;
use crate::error::EngineError;
use crate::models::{BacktestOutcome, Candle};
use crate::simulator::run_backtest;
use rayon::prelude::*;

/// Builds the cartesian grid of capital and drawdown values on top of `base`.
pub fn build_grid(
    base: &BacktestConfig,
    capitals: &[f64],
    drawdown_ratios: &[f64],
) -> Vec<BacktestConfig> {
    let capitals: Vec<f64> = if capitals.is_empty() {
        vec![base.initial_capital]
    } else {
        capitals.to_vec()
    };
    let drawdown_ratios: Vec<f64> = if drawdown_ratios.is_empty() {
        vec![base.max_drawdown_ratio]
    } else {
        drawdown_ratios.to_vec()
    };

    capitals
        .iter()
        .flat_map(|&initial_capital| {
            drawdown_ratios
                .iter()
                .map(move |&max_drawdown_ratio| BacktestConfig {
                    initial_capital,
                    max_drawdown_ratio,
                    ..base.clone()
                })
        })
        .collect()
}

/// Runs independent backtests in parallel. Results keep the order of `configs`.
pub fn run_sweep(
    candles: &[Candle],
    configs: &[BacktestConfig],
) -> Vec<Result<BacktestOutcome, EngineError>> {
    configs
        .par_iter()
        .map(|config| run_backtest(candles, config))
        .collect()
}
