use crate::candle_utils::ensure_sorted;
use crate::config::{BacktestConfig, MissingSignalPolicy, PositionSizing, SignalMode};
use crate::error::EngineError;
use crate::indicators::calculate_heikin_ashi;
use crate::models::{BacktestOutcome, Candle, ExitReason, Position, SignalAction, Trade};
use chrono::NaiveDateTime;
use log::{debug, warn};

/// Entry/exit intent of a single bar, already resolved from the configured signal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarSignal {
    pub enter: bool,
    pub exit: bool,
}

/// The slice of a candle the state machine acts on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub time: NaiveDateTime,
    pub price: f64,
    pub signal: BarSignal,
}

/// Capital, peak and position carried from one bar to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub capital: f64,
    pub peak_capital: f64,
    pub position: Option<Position>,
    pub next_serial: usize,
    pub skipped_entries: usize,
}

impl SimulationState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            peak_capital: initial_capital,
            position: None,
            next_serial: 1,
            skipped_entries: 0,
        }
    }

    /// Advances the state machine by one bar and returns the trade closed on it, if any.
    ///
    /// A flat state may open on an entry signal; a position held into the bar
    /// may close on an exit signal, which takes precedence over the drawdown
    /// stop. The drawdown stop is checked whenever a position is open after
    /// the signal transition, including one opened on this bar.
    /// The peak is refreshed afterwards, so the stop compares against the peak
    /// reached before this bar.
    pub fn step(&mut self, config: &BacktestConfig, bar: &Bar) -> Option<Trade> {
        let closed = match self.position.take() {
            None => {
                if bar.signal.enter {
                    self.try_open(config, bar);
                }
                self.stop_if_below_floor(config, bar)
            }
            Some(position) if bar.signal.exit => {
                Some(self.close(config, position, bar, ExitReason::Signal))
            }
            Some(position) => {
                self.position = Some(position);
                self.stop_if_below_floor(config, bar)
            }
        };

        self.peak_capital = self.peak_capital.max(self.capital);
        closed
    }

    fn stop_if_below_floor(&mut self, config: &BacktestConfig, bar: &Bar) -> Option<Trade> {
        if self.capital >= config.drawdown_floor(self.peak_capital) {
            return None;
        }
        let position = self.position.take()?;
        Some(self.close(config, position, bar, ExitReason::DrawdownStop))
    }

    fn try_open(&mut self, config: &BacktestConfig, bar: &Bar) {
        let lots = affordable_lots(config, self.capital, bar.price);
        if lots == 0 {
            self.skipped_entries += 1;
            debug!(
                "Skipping entry at {}: capital {:.2} does not cover one lot at {:.2}",
                bar.time, self.capital, bar.price
            );
            return;
        }

        let quantity = lots * u64::from(config.lot_size);
        debug!(
            "Opening long at {} price {:.2} qty {}",
            bar.time, bar.price, quantity
        );
        self.position = Some(Position {
            entry_price: bar.price,
            entry_time: bar.time,
            quantity,
        });
    }

    fn close(
        &mut self,
        config: &BacktestConfig,
        position: Position,
        bar: &Bar,
        reason: ExitReason,
    ) -> Trade {
        let pnl = position.realized_pnl(bar.price, config.commission);
        self.capital += pnl;

        let trade = Trade {
            serial: self.next_serial,
            entry_time: position.entry_time,
            exit_time: bar.time,
            entry_price: position.entry_price,
            exit_price: bar.price,
            quantity: position.quantity,
            exit_reason: reason,
            pnl,
            capital_after: self.capital,
        };
        self.next_serial += 1;
        debug!(
            "Closed trade #{} at {} ({}): pnl {:.2}, capital {:.2}",
            trade.serial,
            bar.time,
            reason.as_str(),
            pnl,
            self.capital
        );
        trade
    }
}

/// Whole lots purchasable at `price`. Zero means the entry must be skipped.
///
/// Capped so that `lots * lot_size` always fits the position quantity.
pub fn affordable_lots(config: &BacktestConfig, capital: f64, price: f64) -> u64 {
    if !price.is_finite() {
        return 0;
    }

    match config.position_sizing {
        PositionSizing::FixedOneLot => 1,
        PositionSizing::Dynamic => {
            let lot_cost = price * config.lot_size as f64;
            if lot_cost <= 0.0 || capital <= 0.0 {
                return 0;
            }
            let max_lots = u64::MAX / u64::from(config.lot_size.max(1));
            let lots = (capital / lot_cost).floor();
            if lots >= max_lots as f64 {
                max_lots
            } else {
                lots as u64
            }
        }
    }
}

/// Resolves the per-bar entry/exit intent once, before the simulation loop.
pub fn resolve_signals(
    candles: &[Candle],
    config: &BacktestConfig,
) -> Result<Vec<BarSignal>, EngineError> {
    match config.signal_mode {
        SignalMode::SmoothedTrend => Ok(calculate_heikin_ashi(candles)?
            .into_iter()
            .map(|ha| BarSignal {
                enter: ha.turned_up,
                exit: ha.turned_down,
            })
            .collect()),
        SignalMode::ExternalSignal => {
            let mut missing = 0usize;
            let mut signals = Vec::with_capacity(candles.len());
            for (index, candle) in candles.iter().enumerate() {
                let action = match candle.signal {
                    Some(action) => action,
                    None => match config.missing_signal_policy {
                        MissingSignalPolicy::Reject => {
                            return Err(EngineError::MissingSignal { index })
                        }
                        MissingSignalPolicy::TreatAsNoSignal => {
                            missing += 1;
                            SignalAction::Hold
                        }
                    },
                };
                signals.push(BarSignal {
                    enter: action == SignalAction::Buy,
                    exit: action == SignalAction::Sell,
                });
            }
            if missing > 0 {
                warn!(
                    "{} of {} candles carry no signal value; treating them as no signal",
                    missing,
                    candles.len()
                );
            }
            Ok(signals)
        }
    }
}

/// Runs one backtest over time-ordered candles.
pub fn run_backtest(
    candles: &[Candle],
    config: &BacktestConfig,
) -> Result<BacktestOutcome, EngineError> {
    config.validate()?;
    if candles.is_empty() {
        return Err(EngineError::EmptyInput);
    }
    ensure_sorted(candles)?;

    let signals = resolve_signals(candles, config)?;
    let mut state = SimulationState::new(config.initial_capital);
    let trades: Vec<Trade> = candles
        .iter()
        .zip(signals)
        .map(|(candle, signal)| Bar {
            time: candle.time,
            price: candle.close,
            signal,
        })
        .filter_map(|bar| state.step(config, &bar))
        .collect();

    if let Some(position) = state.position.as_ref() {
        debug!(
            "Position opened at {} is still open after the last candle",
            position.entry_time
        );
    }

    Ok(BacktestOutcome {
        trades,
        initial_capital: config.initial_capital,
        final_capital: state.capital,
        peak_capital: state.peak_capital,
        skipped_entries: state.skipped_entries,
        unclosed_position: state.position,
    })
}
