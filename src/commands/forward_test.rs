use crate::commands::{report_outcome, ConfigOverrides};
use crate::context::AppContext;
use crate::forward::run_forward_test;
use crate::instruments::StrikeSelection;
use crate::market_data::{CandleInterval, CandleRequest};
use crate::performance::PerformanceSummary;
use anyhow::{anyhow, Result};
use chrono::{Duration, Local};
use log::info;
use std::path::Path;

pub async fn run(
    app: &AppContext,
    selection: &StrikeSelection,
    exchange: &str,
    interval: CandleInterval,
    days: u32,
    output: Option<&Path>,
    overrides: &ConfigOverrides,
    print_json: bool,
) -> Result<PerformanceSummary> {
    if days == 0 {
        return Err(anyhow!("Days argument must be greater than zero"));
    }

    let config = overrides.apply(app.backtest_config()?)?;
    let trading_symbol = selection.symbol()?;
    let to = Local::now().naive_local();
    let request = CandleRequest {
        trading_symbol,
        exchange: exchange.trim().to_uppercase(),
        interval,
        from: to - Duration::days(days as i64),
        to,
    };
    info!(
        "Forward testing {} on {} ({} candles, last {} day(s))",
        request.trading_symbol,
        request.exchange,
        interval.as_str(),
        days
    );

    let client = app.kite_client()?;
    let outcome = run_forward_test(&client, &request, &config).await?;
    report_outcome("Forward test", &outcome, output, print_json)
}
