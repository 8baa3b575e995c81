use crate::config::BacktestConfig;
use crate::market_data::{CandleRequest, CandleSource};
use crate::models::BacktestOutcome;
use crate::simulator::run_backtest;
use anyhow::Result;
use log::{info, warn};

/// Runs the strategy over freshly fetched candles.
///
/// An unavailable source or an empty response yields an empty ledger with the
/// starting capital untouched. Configuration and ordering problems in the
/// fetched data are still reported as errors.
pub async fn run_forward_test<S: CandleSource>(
    source: &S,
    request: &CandleRequest,
    config: &BacktestConfig,
) -> Result<BacktestOutcome> {
    config.validate()?;

    let candles = match source.fetch_candles(request).await {
        Ok(candles) => candles,
        Err(err) => {
            warn!(
                "Fetching {} candles for {} from {} failed: {:#}",
                request.interval.as_str(),
                request.trading_symbol,
                source.name(),
                err
            );
            return Ok(BacktestOutcome::empty(config.initial_capital));
        }
    };

    if candles.is_empty() {
        warn!(
            "{} returned no candles for {} between {} and {}",
            source.name(),
            request.trading_symbol,
            request.from,
            request.to
        );
        return Ok(BacktestOutcome::empty(config.initial_capital));
    }

    info!(
        "Running forward test for {} over {} candles",
        request.trading_symbol,
        candles.len()
    );
    Ok(run_backtest(&candles, config)?)
}
