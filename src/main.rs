use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ha_engine::{
    candle_utils::CandleWindow,
    commands::{backtest, forward_test, strikes, sweep, ConfigOverrides},
    context::AppContext,
    instruments::{OptionType, StrikeSelection},
    market_data::CandleInterval,
};
use log::info;
use std::path::PathBuf;

const DEFAULT_TRADES_FILE: &str = "trades.csv";

#[derive(Parser)]
#[command(name = "ha-engine")]
#[command(about = "Heikin-Ashi trend backtester for index options")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a candle CSV (time, open, high, low, close[, signal]) and write the trade ledger
    Backtest {
        /// Candle file to replay
        #[arg(short, long, value_name = "PATH")]
        input: PathBuf,
        /// Destination for the trade ledger
        #[arg(short, long, value_name = "PATH", default_value = DEFAULT_TRADES_FILE)]
        output: PathBuf,
        /// First calendar date to include (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,
        /// Last calendar date to include (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Print the performance summary as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Fetch recent candles for an option contract and run the strategy over them
    ForwardTest {
        /// Underlying index
        #[arg(long, default_value = "NIFTY")]
        underlying: String,
        /// Expiry tag, e.g. 25JUL
        #[arg(long)]
        expiry: String,
        /// At-the-money price estimate
        #[arg(long)]
        atm: i64,
        /// Offset from the ATM estimate
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        strike_gap: i64,
        #[arg(long, value_enum, ignore_case = true, default_value = "CE")]
        option_type: OptionType,
        #[arg(long, value_enum, default_value = "3minute")]
        interval: CandleInterval,
        /// Days of history to fetch
        #[arg(long, default_value_t = 1)]
        days: u32,
        #[arg(long, default_value = "NFO")]
        exchange: String,
        /// Destination for the trade ledger
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Print the performance summary as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Backtest a grid of capital and drawdown settings in parallel
    Sweep {
        /// Candle file to replay
        #[arg(short, long, value_name = "PATH")]
        input: PathBuf,
        /// Comma separated starting capitals
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        capitals: Vec<f64>,
        /// Comma separated drawdown ratios
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        drawdowns: Vec<f64>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Print all summaries as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// List option symbols for strikes around an ATM estimate
    Strikes {
        #[arg(long, default_value = "NIFTY")]
        underlying: String,
        /// Expiry tag, e.g. 25JUL
        #[arg(long)]
        expiry: String,
        /// Spot or futures price to center the ladder on
        #[arg(long)]
        atm: f64,
        #[arg(long, default_value_t = 50)]
        increment: i64,
        /// Strikes on each side of the ATM strike
        #[arg(long, default_value_t = 5)]
        count: usize,
        #[arg(long, value_enum, ignore_case = true, default_value = "CE")]
        option_type: OptionType,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let app_context = AppContext::initialize();

    info!("Starting ha-engine. Simulated trades only; no orders are placed.");

    match cli.command {
        Commands::Backtest {
            input,
            output,
            start_date,
            end_date,
            json,
            overrides,
        } => {
            let window = CandleWindow {
                start_date,
                end_date,
            };
            backtest::run(
                &app_context,
                &input,
                Some(output.as_path()),
                window,
                &overrides,
                json,
            )
            .await?;
        }
        Commands::ForwardTest {
            underlying,
            expiry,
            atm,
            strike_gap,
            option_type,
            interval,
            days,
            exchange,
            output,
            json,
            overrides,
        } => {
            let selection = StrikeSelection {
                underlying,
                expiry,
                atm_price: atm,
                strike_gap,
                option_type,
            };
            forward_test::run(
                &app_context,
                &selection,
                &exchange,
                interval,
                days,
                output.as_deref(),
                &overrides,
                json,
            )
            .await?;
        }
        Commands::Sweep {
            input,
            capitals,
            drawdowns,
            start_date,
            end_date,
            json,
            overrides,
        } => {
            let window = CandleWindow {
                start_date,
                end_date,
            };
            sweep::run(
                &app_context,
                &input,
                window,
                &capitals,
                &drawdowns,
                &overrides,
                json,
            )
            .await?;
        }
        Commands::Strikes {
            underlying,
            expiry,
            atm,
            increment,
            count,
            option_type,
        } => {
            strikes::run(&underlying, &expiry, atm, increment, count, option_type)?;
        }
    }

    Ok(())
}
