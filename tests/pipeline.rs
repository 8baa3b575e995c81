use anyhow::Result;
use chrono::NaiveDate;
use ha_engine::candle_utils::CandleWindow;
use ha_engine::commands::{backtest, sweep, ConfigOverrides};
use ha_engine::config::{PositionSizing, SignalMode};
use ha_engine::context::AppContext;
use ha_engine::csv_io::read_candles_from_path;
use ha_engine::{calculate_heikin_ashi, run_backtest, BacktestConfig};
use std::collections::HashMap;
use std::fmt::Write;
use std::fs;
use std::path::PathBuf;
use std::sync::Once;

const SCENARIO_CSV: &str = "\
TIME,Open,High,Low,Close,Signal
2025-07-01 09:15:00,10,10,10,10,BUY
2025-07-01 09:18:00,12,12,12,8,
2025-07-01 09:21:00,6,10,6,9,SELL
2025-07-01 09:24:00,9,11,9,11,
";

fn ensure_test_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "ha_engine_pipeline_{}_{}",
            std::process::id(),
            name
        ));
        Self { path }
    }

    fn with_contents(name: &str, contents: &str) -> Result<Self> {
        let file = Self::new(name);
        fs::write(&file.path, contents)?;
        Ok(file)
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn empty_app() -> AppContext {
    AppContext::with_settings(HashMap::new())
}

/// A synthetic session alternating between rallies and sell-offs.
fn session_csv(bars: usize) -> String {
    let mut csv = String::from("time,open,high,low,close\n");
    let start = NaiveDate::from_ymd_opt(2025, 7, 1)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    let mut price: f64 = 120.0;
    for i in 0..bars {
        let direction = if (i / 6) % 2 == 0 { 1.0 } else { -1.0 };
        let open = price;
        let close = (open + direction * (2.0 + (i % 3) as f64)).max(1.0);
        let high = open.max(close) + 1.5;
        let low = (open.min(close) - 1.5).max(0.5);
        let time = start + chrono::Duration::minutes(3 * i as i64);
        writeln!(
            csv,
            "{},{:.2},{:.2},{:.2},{:.2}",
            time.format("%Y-%m-%d %H:%M:%S"),
            open,
            high,
            low,
            close
        )
        .unwrap();
        price = close;
    }
    csv
}

#[tokio::test]
async fn backtest_command_writes_expected_ledger() -> Result<()> {
    ensure_test_env();
    let input = TempFile::with_contents("scenario.csv", SCENARIO_CSV)?;
    let output = TempFile::new("scenario_trades.csv");

    let overrides = ConfigOverrides {
        capital: Some(1_000.0),
        lot_size: Some(75),
        commission: Some(70.0),
        signal_mode: Some(SignalMode::ExternalSignal),
        sizing: Some(PositionSizing::FixedOneLot),
        ..ConfigOverrides::default()
    };
    let summary = backtest::run(
        &empty_app(),
        &input.path,
        Some(output.path.as_path()),
        CandleWindow::default(),
        &overrides,
        false,
    )
    .await?;

    assert_eq!(summary.total_trades, 1);
    assert!((summary.net_pnl + 145.0).abs() < 1e-9);
    assert!((summary.final_capital - 855.0).abs() < 1e-9);

    let written = fs::read_to_string(&output.path)?;
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(
        lines,
        vec![
            "S.No,time,exit_time,entry,exit,qty,side,pnl,capital_after",
            "1,2025-07-01 09:15:00,2025-07-01 09:21:00,10.0,9.0,75,BUY,-145.0,855.0",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn settings_supply_defaults_and_cli_overrides_win() -> Result<()> {
    ensure_test_env();
    let input = TempFile::with_contents("settings.csv", SCENARIO_CSV)?;
    let settings: HashMap<String, String> = [
        ("INITIAL_CAPITAL", "1000"),
        ("COMMISSION_PER_TRADE", "0"),
        ("SIGNAL_MODE", "external-signal"),
        ("POSITION_SIZING", "fixed-one-lot"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let app = AppContext::with_settings(settings);

    let summary = backtest::run(
        &app,
        &input.path,
        None,
        CandleWindow::default(),
        &ConfigOverrides::default(),
        false,
    )
    .await?;
    assert!((summary.net_pnl + 75.0).abs() < 1e-9);

    let overrides = ConfigOverrides {
        commission: Some(20.0),
        ..ConfigOverrides::default()
    };
    let summary = backtest::run(
        &app,
        &input.path,
        None,
        CandleWindow::default(),
        &overrides,
        false,
    )
    .await?;
    assert!((summary.net_pnl + 95.0).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn backtest_command_rejects_empty_window() -> Result<()> {
    ensure_test_env();
    let input = TempFile::with_contents("window.csv", SCENARIO_CSV)?;
    let window = CandleWindow {
        start_date: NaiveDate::from_ymd_opt(2025, 8, 1),
        end_date: None,
    };

    let result = backtest::run(
        &empty_app(),
        &input.path,
        None,
        window,
        &ConfigOverrides::default(),
        false,
    )
    .await;
    let err = result.expect_err("empty window should fail");
    assert!(format!("{:#}", err).contains("empty"));
    Ok(())
}

#[test]
fn smoothed_trend_run_respects_ledger_invariants() -> Result<()> {
    ensure_test_env();
    let input = TempFile::with_contents("session.csv", &session_csv(120))?;
    let candles = read_candles_from_path(&input.path)?;
    assert_eq!(candles.len(), 120);

    let smoothed = calculate_heikin_ashi(&candles)?;
    assert_eq!(smoothed.len(), candles.len());
    assert_eq!(smoothed[0].open, (candles[0].open + candles[0].close) / 2.0);
    assert!(smoothed.iter().all(|c| !(c.turned_up && c.turned_down)));

    let config = BacktestConfig::default();
    let outcome = run_backtest(&candles, &config)?;
    assert!(!outcome.trades.is_empty());

    let mut capital = config.initial_capital;
    let mut last_exit = None;
    for (i, trade) in outcome.trades.iter().enumerate() {
        assert_eq!(trade.serial, i + 1);
        assert!(trade.entry_time <= trade.exit_time);
        // one position at a time: the next trade opens after the previous one closed
        if let Some(prev_exit) = last_exit {
            assert!(trade.entry_time > prev_exit);
        }
        last_exit = Some(trade.exit_time);

        let expected_pnl =
            (trade.exit_price - trade.entry_price) * trade.quantity as f64 - config.commission;
        assert!((trade.pnl - expected_pnl).abs() < 1e-6);
        capital += trade.pnl;
        assert!((trade.capital_after - capital).abs() < 1e-6);
        assert_eq!(trade.quantity % u64::from(config.lot_size), 0);
    }
    assert!((outcome.final_capital - capital).abs() < 1e-6);
    assert!(outcome.peak_capital >= config.initial_capital);

    assert_eq!(outcome, run_backtest(&candles, &config)?);
    Ok(())
}

#[test]
fn dynamic_sizing_with_tiny_capital_never_trades() -> Result<()> {
    let input = TempFile::with_contents("tiny.csv", &session_csv(60))?;
    let candles = read_candles_from_path(&input.path)?;
    let config = BacktestConfig {
        initial_capital: 500.0,
        ..BacktestConfig::default()
    };
    let outcome = run_backtest(&candles, &config)?;
    assert!(outcome.trades.is_empty());
    assert!(outcome.skipped_entries > 0);
    assert_eq!(outcome.final_capital, 500.0);
    Ok(())
}

#[tokio::test]
async fn sweep_command_summarizes_each_combination() -> Result<()> {
    ensure_test_env();
    let input = TempFile::with_contents("sweep.csv", &session_csv(90))?;

    let summaries = sweep::run(
        &empty_app(),
        &input.path,
        CandleWindow::default(),
        &[50_000.0, 100_000.0],
        &[0.1, 0.2],
        &ConfigOverrides::default(),
        false,
    )
    .await?;

    assert_eq!(summaries.len(), 4);
    assert_eq!(summaries[0].initial_capital, 50_000.0);
    assert_eq!(summaries[3].initial_capital, 100_000.0);
    Ok(())
}
